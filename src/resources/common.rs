//! Common resource generation utilities.
//!
//! Shared identity, label and ownership stamping for every child object
//! materialized from a template.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::controller::error::{Error, Result};
use crate::controller::events::ReconcileRequest;
use crate::crd::Orderer;

/// Label coupling the Service selector to the StatefulSet pods.
pub const SELECTOR_LABEL: &str = "k8s-app";

/// Value of the `app.kubernetes.io/managed-by` label.
pub const MANAGED_BY: &str = "orderer-operator";

/// Standard labels applied to all managed resources
pub fn standard_labels(request: &ReconcileRequest) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), request.name.clone());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        "orderer".to_string(),
    );
    labels.insert(SELECTOR_LABEL.to_string(), request.name.clone());
    labels
}

/// Labels a Service selects on, and the StatefulSet stamps onto its pods.
pub fn pod_selector_labels(request: &ReconcileRequest) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(SELECTOR_LABEL.to_string(), request.name.clone());
    labels
}

/// Controller owner reference pointing at an Orderer.
///
/// Fails when the Orderer has not been persisted yet (no uid).
pub fn owner_reference(orderer: &Orderer) -> Result<OwnerReference> {
    orderer
        .controller_owner_ref(&())
        .map(|owner| OwnerReference {
            block_owner_deletion: Some(true),
            ..owner
        })
        .ok_or_else(|| {
            Error::MissingField(format!("metadata.uid on Orderer {}", orderer.name_any()))
        })
}

/// Assign identity, labels and ownership to a child object's metadata.
///
/// Template labels are kept; managed labels win on conflicts.
pub fn stamp_metadata(
    metadata: &mut ObjectMeta,
    orderer: &Orderer,
    request: &ReconcileRequest,
) -> Result<()> {
    metadata.name = Some(request.name.clone());
    metadata.namespace = Some(request.namespace.clone());
    metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .extend(standard_labels(request));
    metadata.owner_references = Some(vec![owner_reference(orderer)?]);
    Ok(())
}
