//! Bundled object templates.
//!
//! Templates are JSON documents compiled into the binary and addressed by
//! name. Loading one yields a typed `k8s-openapi` object; the document's
//! `apiVersion` and `kind` must match the requested type.

use std::collections::BTreeMap;

use kube::Resource;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::controller::error::{Error, Result};

/// Template for the orderer's network-facing Service.
pub const ORDERER_SERVICE: &str = "orderer service";

/// Template for the orderer's StatefulSet.
pub const ORDERER_STATEFULSET: &str = "orderer statefulset";

const BUNDLED: &[(&str, &str)] = &[
    (
        ORDERER_SERVICE,
        include_str!("../../templates/orderer/orderer_service.json"),
    ),
    (
        ORDERER_STATEFULSET,
        include_str!("../../templates/orderer/orderer_statefulset.json"),
    ),
];

/// Read-only catalog of object templates keyed by name.
#[derive(Clone, Debug)]
pub struct TemplateStore {
    documents: BTreeMap<String, String>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::bundled()
    }
}

impl TemplateStore {
    /// Catalog shipped with the operator binary.
    pub fn bundled() -> Self {
        Self::from_documents(
            BUNDLED
                .iter()
                .map(|(name, document)| (name.to_string(), document.to_string())),
        )
    }

    /// Build a catalog from arbitrary `(name, document)` pairs.
    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    /// Names of all templates in the catalog.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Load the named template as an object of type `K`.
    pub fn load<K>(&self, name: &str) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let document = self
            .documents
            .get(name)
            .ok_or_else(|| Error::template_load(name, "not found in catalog"))?;

        let value: Value = serde_json::from_str(document)
            .map_err(|e| Error::template_load(name, e.to_string()))?;

        let expected = format!("{}/{}", K::api_version(&()), K::kind(&()));
        let found = format!(
            "{}/{}",
            value.get("apiVersion").and_then(Value::as_str).unwrap_or("<none>"),
            value.get("kind").and_then(Value::as_str).unwrap_or("<none>"),
        );
        if found != expected {
            return Err(Error::schema_mismatch(
                name,
                &expected,
                format!("document declares {found}"),
            ));
        }

        serde_json::from_value(value).map_err(|e| Error::schema_mismatch(name, &expected, e.to_string()))
    }
}
