//! Test fixtures and builder patterns for Orderer.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use orderer_operator::crd::{ConfigParam, Orderer, OrdererSpec};
use std::collections::BTreeMap;

/// Builder for creating Orderer test fixtures.
///
/// # Example
/// ```
/// let orderer = OrdererBuilder::new("orderer0")
///     .namespace("fabric")
///     .storage_class("fast-ssd")
///     .config_param("ORDERER_GENERAL_LOGLEVEL", "debug")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct OrdererBuilder {
    name: String,
    namespace: Option<String>,
    image: String,
    storage_class: String,
    storage_size: String,
    config_params: Vec<ConfigParam>,
    labels: BTreeMap<String, String>,
    generation: Option<i64>,
    uid: Option<String>,
}

impl OrdererBuilder {
    /// Create a new builder with an empty spec.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uid: Some(format!("uid-{name}")),
            name,
            namespace: None,
            image: String::new(),
            storage_class: String::new(),
            storage_size: String::new(),
            config_params: Vec::new(),
            labels: BTreeMap::new(),
            generation: Some(1),
        }
    }

    /// Set the namespace for the Orderer.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the container image.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the storage class.
    pub fn storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = storage_class.into();
        self
    }

    /// Set the storage size.
    pub fn storage_size(mut self, storage_size: impl Into<String>) -> Self {
        self.storage_size = storage_size.into();
        self
    }

    /// Append a configuration parameter.
    pub fn config_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_params.push(ConfigParam::new(name, value));
        self
    }

    /// Add a label to the Orderer.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the UID; `None` mimics an object that was never persisted.
    pub fn uid(mut self, uid: Option<&str>) -> Self {
        self.uid = uid.map(str::to_string);
        self
    }

    /// Build the Orderer.
    pub fn build(self) -> Orderer {
        Orderer {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: self.namespace,
                labels: if self.labels.is_empty() {
                    None
                } else {
                    Some(self.labels)
                },
                generation: self.generation,
                uid: self.uid,
                ..Default::default()
            },
            spec: OrdererSpec {
                image: self.image,
                storage_class: self.storage_class,
                storage_size: self.storage_size,
                config_params: self.config_params,
            },
        }
    }
}

impl Default for OrdererBuilder {
    fn default() -> Self {
        Self::new("orderer0")
    }
}

/// Create an Orderer with an empty spec in the given namespace.
pub fn test_orderer(name: &str, namespace: &str) -> Orderer {
    OrdererBuilder::new(name).namespace(namespace).build()
}
