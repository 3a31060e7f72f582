//! Service materialization for orderers.
//!
//! The Service shares the Orderer's name and namespace and selects the
//! orderer pods through the `k8s-app` label.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Service;

use crate::controller::error::{Error, Result};
use crate::controller::events::ReconcileRequest;
use crate::crd::Orderer;
use crate::resources::common::{pod_selector_labels, stamp_metadata};
use crate::resources::templates::{ORDERER_SERVICE, TemplateStore};

/// Materialize the orderer Service from the bundled template.
pub fn materialize_service(
    templates: &TemplateStore,
    orderer: &Orderer,
    request: &ReconcileRequest,
) -> Result<Service> {
    let mut service: Service = templates.load(ORDERER_SERVICE)?;

    stamp_metadata(&mut service.metadata, orderer, request)?;

    let spec = service
        .spec
        .as_mut()
        .ok_or_else(|| Error::schema_mismatch(ORDERER_SERVICE, "v1/Service", "missing spec"))?;
    spec.selector
        .get_or_insert_with(BTreeMap::new)
        .extend(pod_selector_labels(request));

    Ok(service)
}
