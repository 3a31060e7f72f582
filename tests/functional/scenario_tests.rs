//! Multi-step reconcile scenarios: transient failures, deleted children and
//! deleted Orderers.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use orderer_operator::controller::context::Context;
use orderer_operator::controller::error::Error;
use orderer_operator::controller::events::{EventRouter, ResourceEvent};
use orderer_operator::controller::reconciler::{
    ChildState, ReconcileOutcome, error_policy, forget_deleted, reconcile, reconcile_request,
};
use orderer_operator::controller::store::ClusterStore;

use crate::common::fixtures::test_orderer;
use crate::mock_store::{MockStore, Operation};
use crate::reconcile_tests::{request, setup};

const NAMESPACE: &str = "fabric";

#[tokio::test]
async fn test_partial_failure_recovers_on_retry() {
    let (store, ctx) = setup(test_orderer("orderer0", NAMESPACE));
    store.fail_once(Operation::CreateStatefulSet);

    let first = reconcile_request(&request("orderer0"), &ctx).await;
    let err = first.unwrap_err();
    assert!(matches!(err, Error::Kube(_)));
    assert!(err.is_retryable());
    assert!(store.service(NAMESPACE, "orderer0").is_some());
    assert!(store.statefulset(NAMESPACE, "orderer0").is_none());

    let second = reconcile_request(&request("orderer0"), &ctx).await.unwrap();
    assert_eq!(
        second,
        ReconcileOutcome::Converged {
            service: ChildState::Present,
            workload: ChildState::Created,
        }
    );
    assert_eq!(store.service_count(), 1);
    assert_eq!(store.statefulset_count(), 1);
}

#[tokio::test]
async fn test_failed_read_aborts_before_mutation() {
    let (store, ctx) = setup(test_orderer("orderer0", NAMESPACE));
    store.fail_once(Operation::GetOrderer);

    assert!(reconcile_request(&request("orderer0"), &ctx).await.is_err());
    assert_eq!(store.mutations(), 0);

    store.fail_once(Operation::GetService);
    assert!(reconcile_request(&request("orderer0"), &ctx).await.is_err());
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn test_service_failure_skips_workload() {
    let (store, ctx) = setup(test_orderer("orderer0", NAMESPACE));
    store.fail_once(Operation::CreateService);

    assert!(reconcile_request(&request("orderer0"), &ctx).await.is_err());
    assert_eq!(store.service_count(), 0);
    assert_eq!(store.statefulset_count(), 0);
    assert_eq!(store.mutations(), 1);
}

#[tokio::test]
async fn test_deleted_children_are_recreated() {
    let (store, ctx) = setup(test_orderer("orderer0", NAMESPACE));
    reconcile_request(&request("orderer0"), &ctx).await.unwrap();

    let deleted = store.service(NAMESPACE, "orderer0").unwrap();
    store.remove_service(NAMESPACE, "orderer0");

    // The deletion event routes back to the owning Orderer
    let routed = EventRouter::for_orderers()
        .route(&ResourceEvent::Deleted(deleted))
        .unwrap();
    assert_eq!(routed, request("orderer0"));

    let outcome = reconcile_request(&routed, &ctx).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Converged {
            service: ChildState::Created,
            workload: ChildState::Present,
        }
    );

    store.remove_statefulset(NAMESPACE, "orderer0");
    let outcome = reconcile_request(&routed, &ctx).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Converged {
            service: ChildState::Present,
            workload: ChildState::Created,
        }
    );
    assert_eq!(store.mutations(), 4);
}

#[tokio::test]
async fn test_deleted_orderer_is_not_reconciled() {
    let (store, ctx) = setup(test_orderer("orderer0", NAMESPACE));
    reconcile_request(&request("orderer0"), &ctx).await.unwrap();
    let created_child = store.statefulset(NAMESPACE, "orderer0").unwrap();

    store.remove_orderer(NAMESPACE, "orderer0");
    let before = store.mutations();

    // A late child event still routes to the Orderer, which is gone
    let routed = EventRouter::for_orderers()
        .route(&ResourceEvent::Applied(created_child))
        .unwrap();
    let outcome = reconcile_request(&routed, &ctx).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::PrimaryGone);
    assert_eq!(store.mutations(), before);
}

#[tokio::test]
async fn test_controller_adapter_waits_for_changes() {
    let orderer = test_orderer("orderer0", NAMESPACE);
    let (store, ctx) = setup(orderer.clone());
    let ctx = Arc::new(ctx);

    let action = reconcile(Arc::new(orderer), ctx).await.unwrap();

    assert_eq!(action, Action::await_change());
    assert_eq!(store.statefulset_count(), 1);
}

#[tokio::test]
async fn test_error_policy_backs_off_per_key() {
    let orderer = Arc::new(test_orderer("orderer0", NAMESPACE));
    let store = Arc::new(MockStore::new());
    let ctx = Arc::new(Context::with_store(store.clone() as Arc<dyn ClusterStore>));
    let err = Error::template_load("orderer service", "missing");

    assert_eq!(
        error_policy(orderer.clone(), &err, ctx.clone()),
        Action::requeue(Duration::from_secs(1))
    );
    assert_eq!(
        error_policy(orderer.clone(), &err, ctx.clone()),
        Action::requeue(Duration::from_secs(2))
    );

    // A successful reconcile resets the backoff for the key
    store.put_orderer((*orderer).clone());
    reconcile(orderer.clone(), ctx.clone()).await.unwrap();
    assert_eq!(ctx.backoff.failures(&request("orderer0")), 0);
    assert_eq!(
        error_policy(orderer, &err, ctx),
        Action::requeue(Duration::from_secs(1))
    );
}

#[tokio::test]
async fn test_error_policy_validation_waits_longer() {
    let orderer = Arc::new(test_orderer("orderer0", NAMESPACE));
    let (_store, ctx) = setup((*orderer).clone());
    let err = Error::Validation("storageSize 'x' is not a valid quantity".to_string());

    assert_eq!(
        error_policy(orderer, &err, Arc::new(ctx)),
        Action::requeue(Duration::from_secs(300))
    );
}

#[tokio::test]
async fn test_orderer_delete_event_routes_to_its_own_key() {
    let orderer = test_orderer("orderer0", NAMESPACE);
    let (store, ctx) = setup(orderer.clone());
    let router = EventRouter::for_orderers();

    let applied = router.route(&ResourceEvent::Applied(orderer.clone())).unwrap();
    assert_eq!(applied, request("orderer0"));
    reconcile_request(&applied, &ctx).await.unwrap();

    store.remove_orderer(NAMESPACE, "orderer0");
    let before = store.mutations();
    let deleted = router.route(&ResourceEvent::Deleted(orderer)).unwrap();
    assert_eq!(deleted, request("orderer0"));

    let outcome = reconcile_request(&deleted, &ctx).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::PrimaryGone);
    assert_eq!(store.mutations(), before);
}

#[tokio::test]
async fn test_deleted_orderer_leaves_no_backoff_state() {
    let orderer = Arc::new(test_orderer("orderer0", NAMESPACE));
    let (_store, ctx) = setup((*orderer).clone());
    let ctx = Arc::new(ctx);
    let err = Error::template_load("orderer service", "missing");

    error_policy(orderer.clone(), &err, ctx.clone());
    error_policy(orderer.clone(), &err, ctx.clone());
    assert_eq!(ctx.backoff.tracked(), 1);

    // The scheduler drops the key without another reconcile
    forget_deleted(&request("orderer0"), &ctx);
    assert_eq!(ctx.backoff.tracked(), 0);
    assert_eq!(
        error_policy(orderer, &err, ctx),
        Action::requeue(Duration::from_secs(1))
    );
}
