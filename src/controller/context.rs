//! Shared context for the controller.
//!
//! The Context struct holds everything the reconciler needs, injected at
//! construction: the cluster store, the template catalog, the logging span,
//! the optional event recorder and metrics.

use std::sync::Arc;

use kube::Client;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Resource;
use tracing::{Span, info_span};

use crate::controller::backoff::{Backoff, BackoffConfig};
use crate::controller::store::{ClusterStore, FIELD_MANAGER, KubeStore};
use crate::crd::Orderer;
use crate::health::HealthState;
use crate::resources::TemplateStore;

/// Shared context for the controller
pub struct Context {
    /// Cluster state store
    pub store: Arc<dyn ClusterStore>,
    /// Object templates
    pub templates: TemplateStore,
    /// Parent span for every reconcile
    pub span: Span,
    /// Optional health state for metrics and readiness
    pub health_state: Option<Arc<HealthState>>,
    /// Per-key requeue backoff
    pub backoff: Backoff,
    /// Event recorder, absent when running without a Kubernetes client
    recorder: Option<Recorder>,
}

impl Context {
    /// Create a context backed by the API server.
    ///
    /// `instance` names this replica on published events.
    pub fn new(
        client: Client,
        health_state: Option<Arc<HealthState>>,
        instance: Option<String>,
    ) -> Self {
        let reporter = event_reporter(instance);
        Self {
            store: Arc::new(KubeStore::new(client.clone())),
            templates: TemplateStore::bundled(),
            span: info_span!("orderer_controller"),
            health_state,
            backoff: Backoff::default(),
            recorder: Some(Recorder::new(client, reporter)),
        }
    }

    /// Create a context over an arbitrary store, without event publishing
    pub fn with_store(store: Arc<dyn ClusterStore>) -> Self {
        Self {
            store,
            templates: TemplateStore::bundled(),
            span: info_span!("orderer_controller"),
            health_state: None,
            backoff: Backoff::default(),
            recorder: None,
        }
    }

    /// Replace the template catalog
    pub fn templates(mut self, templates: TemplateStore) -> Self {
        self.templates = templates;
        self
    }

    /// Replace the logging span
    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Replace the backoff configuration
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Backoff::new(config);
        self
    }

    /// Publish a normal event for an Orderer
    pub async fn publish_normal_event(
        &self,
        orderer: &Orderer,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(orderer, EventType::Normal, reason, action, note)
            .await;
    }

    /// Publish a warning event for an Orderer
    pub async fn publish_warning_event(
        &self,
        orderer: &Orderer,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.publish(orderer, EventType::Warning, reason, action, note)
            .await;
    }

    async fn publish(
        &self,
        orderer: &Orderer,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let object_ref = orderer.object_ref(&());
        if let Err(e) = recorder
            .publish(
                &Event {
                    type_,
                    reason: reason.into(),
                    note,
                    action: action.into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!(reason = %reason, error = %e, "Failed to publish event");
        }
    }
}

/// Reporter identifying this controller replica on events
pub fn event_reporter(instance: Option<String>) -> Reporter {
    Reporter {
        controller: FIELD_MANAGER.into(),
        instance,
    }
}
