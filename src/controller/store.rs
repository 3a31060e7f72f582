//! Cluster state access used by the reconciler.
//!
//! The reconciler only ever reads objects by key and creates missing ones.
//! `KubeStore` backs this with the API server; tests substitute an
//! in-memory implementation.

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::controller::error::{Error, Result};
use crate::crd::Orderer;

/// Field manager recorded on objects created by the operator
pub const FIELD_MANAGER: &str = "orderer-operator";

/// Narrow view of the cluster state store.
///
/// `get_*` return `Ok(None)` when the object does not exist; every other
/// failure is an error.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an Orderer by key.
    async fn get_orderer(&self, namespace: &str, name: &str) -> Result<Option<Orderer>>;

    /// Fetch a Service by key.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>>;

    /// Create a Service in the namespace set on its metadata.
    async fn create_service(&self, service: &Service) -> Result<()>;

    /// Fetch a StatefulSet by key.
    async fn get_statefulset(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>>;

    /// Create a StatefulSet in the namespace set on its metadata.
    async fn create_statefulset(&self, statefulset: &StatefulSet) -> Result<()>;
}

/// API server backed store.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store on top of a Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(Error::Kube(e)),
        }
    }

    async fn create<K>(&self, obj: &K) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = obj
            .namespace()
            .ok_or_else(|| Error::MissingField(format!("metadata.namespace on {}", obj.name_any())))?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.create(&params, obj).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_orderer(&self, namespace: &str, name: &str) -> Result<Option<Orderer>> {
        self.get(namespace, name).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        self.get(namespace, name).await
    }

    async fn create_service(&self, service: &Service) -> Result<()> {
        self.create(service).await
    }

    async fn get_statefulset(&self, namespace: &str, name: &str) -> Result<Option<StatefulSet>> {
        self.get(namespace, name).await
    }

    async fn create_statefulset(&self, statefulset: &StatefulSet) -> Result<()> {
        self.create(statefulset).await
    }
}
