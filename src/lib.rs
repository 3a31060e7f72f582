//! orderer-operator library crate
//!
//! This module exports the controller, CRD definitions, and resource generators.

pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod resources;

pub use config::OperatorConfig;
pub use health::HealthState;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{Controller, WatchStreamExt, metadata_watcher, predicates, reflector, watcher};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use controller::context::Context;
use controller::events::{EventRouter, ReconcileRequest};
use controller::reconciler::{error_policy, forget_deleted, reconcile};
use crd::Orderer;

/// Create namespaced or cluster-wide API based on scope
pub fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Watcher configuration shared by every watch.
///
/// `any_semantic()` lets list calls be served from the API server cache.
fn default_watcher_config() -> WatcherConfig {
    WatcherConfig::default().any_semantic()
}

/// Create a filtered stream for a resource type with standard optimizations.
///
/// This creates a reflector-backed stream that:
/// - Maintains an in-memory cache via reflector
/// - Uses automatic retry with exponential backoff on errors
/// - Converts watch events to objects (Added/Modified only)
/// - Filters out status-only updates via generation predicate
///
/// Returns the reflector store (for cache lookups) and the filtered stream.
fn create_filtered_stream<K>(
    api: Api<K>,
    watcher_config: WatcherConfig,
) -> (
    reflector::Store<K>,
    impl Stream<Item = Result<K, watcher::Error>>,
)
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug + Send + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);
    (reader, stream)
}

/// Run the Orderer controller as configured by the process environment.
///
/// Watches `config.watch_namespace` (or the whole cluster) and reports events
/// as `config.pod_name`. If health_state is provided, metrics will be
/// recorded for reconciliations.
pub async fn run_controller(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    config: &OperatorConfig,
) {
    run_controller_scoped(
        client,
        health_state,
        config.watch_namespace.as_deref(),
        Some(config.pod_name.clone()),
    )
    .await
}

/// Run the Orderer controller with optional namespace scoping.
///
/// When `namespace` is `Some(ns)`, only watches resources in that namespace.
/// When `namespace` is `None`, watches resources cluster-wide.
/// `instance` identifies this replica on published events.
///
/// The kube-runtime scheduler coalesces requests for the same Orderer and
/// never runs two reconciles for one key at the same time.
pub async fn run_controller_scoped(
    client: Client,
    health_state: Option<Arc<HealthState>>,
    namespace: Option<&str>,
    instance: Option<String>,
) {
    let scope_msg = namespace.unwrap_or("cluster-wide");
    info!("Starting controller for Orderer resources (scope: {})", scope_msg);

    if let Some(ref state) = health_state {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(Context::new(client.clone(), health_state, instance));
    let cleanup_ctx = ctx.clone();

    let orderers: Api<Orderer> = scoped_api(client.clone(), namespace);
    let services: Api<Service> = scoped_api(client.clone(), namespace);
    let statefulsets: Api<StatefulSet> = scoped_api(client.clone(), namespace);

    let watcher_config = default_watcher_config();
    let (reader, orderer_stream) = create_filtered_stream(orderers, watcher_config.clone());

    // Children are only checked for existence, so metadata is enough.
    // touched_objects keeps deletions: a deleted child must be recreated.
    let router = EventRouter::for_orderers();
    let service_router = router.clone();
    let statefulset_router = router;

    Controller::for_stream(orderer_stream, reader)
        .watches_stream(
            metadata_watcher(services, watcher_config.clone())
                .default_backoff()
                .touched_objects(),
            move |service| {
                service_router
                    .route_owned(&service)
                    .map(|request| request.object_ref())
            },
        )
        .watches_stream(
            metadata_watcher(statefulsets, watcher_config)
                .default_backoff()
                .touched_objects(),
            move |statefulset| {
                statefulset_router
                    .route_owned(&statefulset)
                    .map(|request| request.object_ref())
            },
        )
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            let ctx = cleanup_ctx.clone();
            async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!("Reconciled: {}", obj.name);
                    }
                    // Watch events for children of a deleted Orderer can still
                    // reach the scheduler after the Orderer is gone
                    Err(kube::runtime::controller::Error::ObjectNotFound(obj_ref)) => {
                        let request = ReconcileRequest::new(
                            obj_ref.namespace.clone().unwrap_or_else(|| "default".to_string()),
                            obj_ref.name.clone(),
                        );
                        forget_deleted(&request, &ctx);
                        debug!("Object no longer exists (likely deleted): {}", obj_ref);
                    }
                    Err(kube::runtime::controller::Error::ReconcilerFailed(err, obj_ref))
                        if err.is_not_found() =>
                    {
                        debug!("Object no longer exists (likely deleted): {}", obj_ref);
                    }
                    Err(e) => {
                        error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    // This should never complete in normal operation
    error!("Controller stream ended unexpectedly");
}
