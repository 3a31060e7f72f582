//! Orderer Custom Resource Definition.
//!
//! An `Orderer` describes a single Hyperledger Fabric ordering node. The
//! controller never writes to it; every field is read-only desired state and
//! empty values are defaulted when child objects are materialized.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the Orderer resource.
pub const ORDERER_GROUP: &str = "fabric.hyperledger.org";

/// API version of the Orderer resource.
pub const ORDERER_VERSION: &str = "v1alpha1";

/// Kind of the Orderer resource.
pub const ORDERER_KIND: &str = "Orderer";

/// Orderer is a custom resource for deploying a Fabric ordering node.
///
/// Example:
/// ```yaml
/// apiVersion: fabric.hyperledger.org/v1alpha1
/// kind: Orderer
/// metadata:
///   name: orderer1
/// spec:
///   image: hyperledger/fabric-orderer:1.4.1
///   storageClass: fast-ssd
///   storageSize: 10Gi
///   configParams:
///     - name: ORDERER_GENERAL_LOGLEVEL
///       value: debug
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "fabric.hyperledger.org",
    version = "v1alpha1",
    kind = "Orderer",
    plural = "orderers",
    namespaced,
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Storage", "type":"string", "jsonPath":".spec.storageSize"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrdererSpec {
    /// Orderer container image. Empty selects the pinned baseline image.
    #[serde(default)]
    pub image: String,

    /// Storage class for the ledger volume. Empty selects the platform default class.
    #[serde(default)]
    pub storage_class: String,

    /// Capacity of the ledger volume (e.g. "10Gi"). Empty selects the baseline size.
    #[serde(default)]
    pub storage_size: String,

    /// Runtime configuration injected verbatim, in order, as container environment.
    #[serde(default)]
    pub config_params: Vec<ConfigParam>,
}

/// A single name/value configuration entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ConfigParam {
    /// Environment variable name.
    pub name: String,
    /// Environment variable value.
    #[serde(default)]
    pub value: String,
}

impl ConfigParam {
    /// Create a new configuration entry.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
