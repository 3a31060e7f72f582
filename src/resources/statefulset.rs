//! StatefulSet materialization for orderers.
//!
//! Starts from the bundled template and fills in:
//! - identity and the `k8s-app` selector coupling with the Service
//! - storage class and capacity of every volume claim template
//! - container image and environment from the Orderer spec

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{EnvVar, VolumeResourceRequirements};
use tracing::error;

use crate::controller::error::{Error, Result};
use crate::controller::events::ReconcileRequest;
use crate::crd::{ConfigParam, Orderer};
use crate::resources::common::{pod_selector_labels, stamp_metadata};
use crate::resources::defaults;
use crate::resources::templates::{ORDERER_STATEFULSET, TemplateStore};

const EXPECTED: &str = "apps/v1/StatefulSet";

/// Materialize the orderer StatefulSet from the bundled template.
pub fn materialize_statefulset(
    templates: &TemplateStore,
    orderer: &Orderer,
    request: &ReconcileRequest,
) -> Result<StatefulSet> {
    let mut sts: StatefulSet = templates.load(ORDERER_STATEFULSET).inspect_err(|e| {
        error!(template = ORDERER_STATEFULSET, error = %e, "Failed to load statefulset template");
    })?;

    stamp_metadata(&mut sts.metadata, orderer, request)?;

    let spec = sts
        .spec
        .as_mut()
        .ok_or_else(|| Error::schema_mismatch(ORDERER_STATEFULSET, EXPECTED, "missing spec"))?;

    spec.service_name = Some(request.name.clone());
    spec.selector
        .match_labels
        .get_or_insert_with(BTreeMap::new)
        .extend(pod_selector_labels(request));

    let claims = spec
        .volume_claim_templates
        .as_mut()
        .filter(|claims| !claims.is_empty())
        .ok_or_else(|| {
            Error::schema_mismatch(ORDERER_STATEFULSET, EXPECTED, "no volume claim templates")
        })?;
    let storage_class = defaults::storage_class(&orderer.spec.storage_class);
    let storage_size = defaults::storage_size(&orderer.spec.storage_size);
    for claim in claims.iter_mut() {
        let claim_spec = claim.spec.get_or_insert_with(Default::default);
        claim_spec.storage_class_name = Some(storage_class.clone());
        claim_spec
            .resources
            .get_or_insert_with(VolumeResourceRequirements::default)
            .requests
            .get_or_insert_with(BTreeMap::new)
            .insert("storage".to_string(), storage_size.clone());
    }

    spec.template
        .metadata
        .get_or_insert_with(Default::default)
        .labels
        .get_or_insert_with(BTreeMap::new)
        .extend(pod_selector_labels(request));

    let container = spec
        .template
        .spec
        .as_mut()
        .and_then(|pod| pod.containers.first_mut())
        .ok_or_else(|| Error::schema_mismatch(ORDERER_STATEFULSET, EXPECTED, "no containers"))?;
    container.image = Some(defaults::image(&orderer.spec.image));
    container.env = Some(environment(&orderer.spec.config_params));

    Ok(sts)
}

/// Expand config params into container environment, keeping order and duplicates.
pub fn environment(params: &[ConfigParam]) -> Vec<EnvVar> {
    params
        .iter()
        .map(|param| EnvVar {
            name: param.name.clone(),
            value: Some(param.value.clone()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::crd::OrdererSpec;
    use crate::resources::common::SELECTOR_LABEL;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn test_orderer(spec: OrdererSpec) -> Orderer {
        let mut orderer = Orderer::new("orderer0", spec);
        orderer.metadata.namespace = Some("fabric".to_string());
        orderer.metadata.uid = Some("test-uid".to_string());
        orderer
    }

    fn materialize(spec: OrdererSpec) -> StatefulSet {
        let request = ReconcileRequest::new("fabric", "orderer0");
        materialize_statefulset(&TemplateStore::bundled(), &test_orderer(spec), &request).unwrap()
    }

    #[test]
    fn test_identity_and_selector_coupling() {
        let sts = materialize(OrdererSpec::default());
        assert_eq!(sts.metadata.name, Some("orderer0".to_string()));
        assert_eq!(sts.metadata.namespace, Some("fabric".to_string()));

        let spec = sts.spec.unwrap();
        assert_eq!(spec.service_name, Some("orderer0".to_string()));
        let selector = spec.selector.match_labels.unwrap();
        assert_eq!(selector.get(SELECTOR_LABEL), Some(&"orderer0".to_string()));
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(pod_labels.get(SELECTOR_LABEL), Some(&"orderer0".to_string()));
    }

    #[test]
    fn test_empty_spec_uses_defaults() {
        let sts = materialize(OrdererSpec::default());
        let spec = sts.spec.unwrap();

        let claim = spec.volume_claim_templates.unwrap()[0].spec.clone().unwrap();
        assert_eq!(claim.storage_class_name, Some("default".to_string()));
        let requests = claim.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("5Gi".to_string())));

        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(
            container.image,
            Some("hyperledger/fabric-orderer:1.4.1".to_string())
        );
        assert_eq!(container.env, Some(vec![]));
    }

    #[test]
    fn test_overrides_win() {
        let sts = materialize(OrdererSpec {
            image: "hyperledger/fabric-orderer:2.2".to_string(),
            storage_class: "fast-ssd".to_string(),
            storage_size: "20Gi".to_string(),
            config_params: vec![],
        });
        let spec = sts.spec.unwrap();

        let claim = spec.volume_claim_templates.unwrap()[0].spec.clone().unwrap();
        assert_eq!(claim.storage_class_name, Some("fast-ssd".to_string()));
        let requests = claim.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage"), Some(&Quantity("20Gi".to_string())));

        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(
            container.image,
            Some("hyperledger/fabric-orderer:2.2".to_string())
        );
    }

    #[test]
    fn test_environment_preserves_order_and_duplicates() {
        let env = environment(&[
            ConfigParam::new("B", "2"),
            ConfigParam::new("A", "1"),
            ConfigParam::new("B", "3"),
        ]);
        let pairs: Vec<(&str, Option<&str>)> = env
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![("B", Some("2")), ("A", Some("1")), ("B", Some("3"))]
        );
    }

    #[test]
    fn test_template_without_claims_is_rejected() {
        let doc = r#"{
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": {},
            "spec": {
                "selector": {"matchLabels": {}},
                "serviceName": "x",
                "template": {"spec": {"containers": [{"name": "orderer"}]}}
            }
        }"#;
        let templates =
            TemplateStore::from_documents([(ORDERER_STATEFULSET.to_string(), doc.to_string())]);
        let request = ReconcileRequest::new("fabric", "orderer0");
        let err = materialize_statefulset(&templates, &test_orderer(OrdererSpec::default()), &request)
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_template_without_containers_is_rejected() {
        let doc = r#"{
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": {},
            "spec": {
                "selector": {"matchLabels": {}},
                "serviceName": "x",
                "template": {"spec": {"containers": []}},
                "volumeClaimTemplates": [{"metadata": {"name": "data"}, "spec": {}}]
            }
        }"#;
        let templates =
            TemplateStore::from_documents([(ORDERER_STATEFULSET.to_string(), doc.to_string())]);
        let request = ReconcileRequest::new("fabric", "orderer0");
        let err = materialize_statefulset(&templates, &test_orderer(OrdererSpec::default()), &request)
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_missing_template_surfaces_load_error() {
        let templates = TemplateStore::from_documents(std::iter::empty());
        let request = ReconcileRequest::new("fabric", "orderer0");
        let err = materialize_statefulset(&templates, &test_orderer(OrdererSpec::default()), &request)
            .unwrap_err();
        assert!(matches!(err, Error::TemplateLoad { .. }));
    }
}
