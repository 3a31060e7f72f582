//! Reconciliation loop for Orderer.
//!
//! A reconcile walks `LoadPrimary -> EnsureService -> EnsureWorkload -> Done`.
//! Any failure aborts the remaining steps and is returned to the scheduler,
//! which requeues the key. Children are only ever created, never patched or
//! deleted; cleanup is left to owner-reference garbage collection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use kube::runtime::controller::Action;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::events::ReconcileRequest;
use crate::controller::validation::validate_spec;
use crate::crd::Orderer;
use crate::resources::{materialize_service, materialize_statefulset};

/// Steps of a single reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    LoadPrimary,
    EnsureService,
    EnsureWorkload,
    Done,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::LoadPrimary => write!(f, "LoadPrimary"),
            Step::EnsureService => write!(f, "EnsureService"),
            Step::EnsureWorkload => write!(f, "EnsureWorkload"),
            Step::Done => write!(f, "Done"),
        }
    }
}

/// What a reconcile found for one child object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildState {
    /// The child was missing and has been created.
    Created,
    /// The child already existed and was left untouched.
    Present,
}

/// Result of a successful reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Orderer no longer exists; nothing was done.
    PrimaryGone,
    /// Both children exist.
    Converged {
        service: ChildState,
        workload: ChildState,
    },
}

impl ReconcileOutcome {
    /// Number of objects created by this reconcile.
    pub fn created(&self) -> usize {
        match self {
            ReconcileOutcome::PrimaryGone => 0,
            ReconcileOutcome::Converged { service, workload } => [service, workload]
                .into_iter()
                .filter(|state| **state == ChildState::Created)
                .count(),
        }
    }
}

/// Reconcile the Orderer identified by `request`.
///
/// Safe to call repeatedly for the same key: only missing children are
/// created. The caller is responsible for serializing calls per key.
pub async fn reconcile_request(
    request: &ReconcileRequest,
    ctx: &Context,
) -> Result<ReconcileOutcome> {
    let span = info_span!(
        parent: &ctx.span,
        "reconcile",
        namespace = %request.namespace,
        name = %request.name
    );
    converge(request, ctx).instrument(span).await
}

async fn converge(request: &ReconcileRequest, ctx: &Context) -> Result<ReconcileOutcome> {
    debug!("Reconciling Orderer");

    let orderer = ctx
        .store
        .get_orderer(&request.namespace, &request.name)
        .await
        .inspect_err(|e| error!(step = %Step::LoadPrimary, error = %e, "Failed to get Orderer"))?;
    let Some(orderer) = orderer else {
        // Owned children are garbage collected through their owner references
        info!("Orderer not found, ignoring since it must have been deleted");
        return Ok(ReconcileOutcome::PrimaryGone);
    };

    validate_spec(&orderer)
        .inspect_err(|e| warn!(step = %Step::LoadPrimary, error = %e, "Invalid Orderer spec"))?;

    let service = ensure_service(&orderer, request, ctx).await?;
    let workload = ensure_statefulset(&orderer, request, ctx).await?;

    debug!(step = %Step::Done, ?service, ?workload, "Reconciled Orderer");
    Ok(ReconcileOutcome::Converged { service, workload })
}

async fn ensure_service(
    orderer: &Orderer,
    request: &ReconcileRequest,
    ctx: &Context,
) -> Result<ChildState> {
    let existing = ctx
        .store
        .get_service(&request.namespace, &request.name)
        .await
        .inspect_err(|e| error!(step = %Step::EnsureService, error = %e, "Failed to get Service"))?;
    if existing.is_some() {
        return Ok(ChildState::Present);
    }

    let service = materialize_service(&ctx.templates, orderer, request)?;
    info!(
        service.namespace = %request.namespace,
        service.name = %request.name,
        "Creating a new Service"
    );
    ctx.store.create_service(&service).await.inspect_err(|e| {
        error!(step = %Step::EnsureService, error = %e, "Failed to create Service");
    })?;

    record_created(ctx, "Service");
    ctx.publish_normal_event(
        orderer,
        "ServiceCreated",
        "CreateService",
        Some(format!("Created Service {request}")),
    )
    .await;
    Ok(ChildState::Created)
}

async fn ensure_statefulset(
    orderer: &Orderer,
    request: &ReconcileRequest,
    ctx: &Context,
) -> Result<ChildState> {
    let existing = ctx
        .store
        .get_statefulset(&request.namespace, &request.name)
        .await
        .inspect_err(|e| {
            error!(step = %Step::EnsureWorkload, error = %e, "Failed to get StatefulSet");
        })?;
    if existing.is_some() {
        return Ok(ChildState::Present);
    }

    let statefulset = materialize_statefulset(&ctx.templates, orderer, request)?;
    info!(
        statefulset.namespace = %request.namespace,
        statefulset.name = %request.name,
        "Creating a new StatefulSet"
    );
    ctx.store
        .create_statefulset(&statefulset)
        .await
        .inspect_err(|e| {
            error!(step = %Step::EnsureWorkload, error = %e, "Failed to create StatefulSet");
        })?;

    record_created(ctx, "StatefulSet");
    ctx.publish_normal_event(
        orderer,
        "StatefulSetCreated",
        "CreateStatefulSet",
        Some(format!("Created StatefulSet {request}")),
    )
    .await;
    Ok(ChildState::Created)
}

fn record_created(ctx: &Context, kind: &str) {
    if let Some(ref health_state) = ctx.health_state {
        health_state.metrics.record_child_created(kind);
    }
}

/// Reconcile an Orderer delivered by the kube-runtime controller.
///
/// Only the object's key is used; current state is re-read from the store.
pub async fn reconcile(obj: Arc<Orderer>, ctx: Arc<Context>) -> Result<Action> {
    let start_time = Instant::now();
    let request = ReconcileRequest::for_orderer(&obj)
        .ok_or_else(|| Error::MissingField("metadata.name".to_string()))?;

    match reconcile_request(&request, &ctx).await {
        Ok(outcome) => {
            ctx.backoff.on_success(&request);
            if let Some(ref health_state) = ctx.health_state {
                health_state.metrics.record_reconcile(
                    &request.namespace,
                    &request.name,
                    start_time.elapsed().as_secs_f64(),
                );
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                health_state.last_reconcile.store(now, Ordering::Relaxed);
            }
            debug!(request = %request, created = outcome.created(), "Reconcile finished");
            // Level-triggered: the next watch event drives the next reconcile
            Ok(Action::await_change())
        }
        Err(e) => {
            ctx.publish_warning_event(&obj, "ReconcileFailed", "Reconciling", Some(e.to_string()))
                .await;
            Err(e)
        }
    }
}

/// Error policy for the controller
pub fn error_policy(obj: Arc<Orderer>, error: &Error, ctx: Arc<Context>) -> Action {
    let Some(request) = ReconcileRequest::for_orderer(&obj) else {
        return Action::await_change();
    };

    if let Some(ref health_state) = ctx.health_state {
        health_state
            .metrics
            .record_error(&request.namespace, &request.name);
    }

    if error.is_not_found() {
        debug!(request = %request, "Resource not found (likely deleted)");
        ctx.backoff.forget(&request);
        return Action::await_change();
    }

    let delay = ctx.backoff.on_failure(&request, error);
    if error.is_retryable() {
        warn!(request = %request, error = %error, delay_secs = delay.as_secs(), "Retryable error, will retry");
    } else {
        error!(request = %request, error = %error, delay_secs = delay.as_secs(), "Non-retryable error");
    }
    Action::requeue(delay)
}

/// Drop per-key state for an Orderer the scheduler no longer finds.
///
/// kube-runtime reports such keys as `ObjectNotFound` without calling
/// `reconcile` or `error_policy`.
pub fn forget_deleted(request: &ReconcileRequest, ctx: &Context) {
    debug!(request = %request, "Forgetting deleted Orderer");
    ctx.backoff.forget(request);
}
