//! Validation of the Orderer spec.
//!
//! Empty fields are valid: they are replaced by defaults when the children
//! are materialized. Only values that would produce objects the API server
//! rejects are refused here.

use crate::controller::error::{Error, Result};
use crate::crd::Orderer;

/// Validate the Orderer spec
pub fn validate_spec(orderer: &Orderer) -> Result<()> {
    validate_storage_size(orderer)?;
    validate_config_params(orderer)?;
    Ok(())
}

fn validate_storage_size(orderer: &Orderer) -> Result<()> {
    let size = orderer.spec.storage_size.as_str();
    if size.is_empty() || is_valid_quantity(size) {
        return Ok(());
    }
    Err(Error::Validation(format!(
        "storageSize '{size}' is not a valid quantity (e.g. 5Gi, 500Mi)"
    )))
}

fn validate_config_params(orderer: &Orderer) -> Result<()> {
    if let Some(position) = orderer
        .spec
        .config_params
        .iter()
        .position(|param| param.name.trim().is_empty())
    {
        return Err(Error::Validation(format!(
            "configParams[{position}] has an empty name"
        )));
    }
    Ok(())
}

/// Check if a storage quantity string is valid
///
/// Follows the Kubernetes quantity grammar: a signed number (`5`, `5.`, `.5`,
/// `1.5`) followed by a binary SI suffix, a decimal SI suffix, or a decimal
/// exponent (`e3`, `E-2`).
fn is_valid_quantity(size: &str) -> bool {
    use std::sync::LazyLock;
    static QUANTITY_RE: LazyLock<Option<regex::Regex>> = LazyLock::new(|| {
        regex::Regex::new(
            r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei|[eE][+-]?[0-9]+|[mkMGTPE])?$",
        )
        .ok()
    });
    QUANTITY_RE.as_ref().is_some_and(|re| re.is_match(size))
}
