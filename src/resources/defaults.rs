//! Default resolution for optional spec fields.
//!
//! Spec fields are plain values where "empty" means "not set"; the resolver
//! picks the fallback in that case and keeps the override otherwise.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Orderer image used when the spec leaves `image` empty.
pub const DEFAULT_IMAGE: &str = "hyperledger/fabric-orderer:1.4.1";

/// Storage class used when the spec leaves `storageClass` empty.
pub const DEFAULT_STORAGE_CLASS: &str = "default";

/// Volume capacity used when the spec leaves `storageSize` empty.
pub const DEFAULT_STORAGE_SIZE: &str = "5Gi";

/// Return `value` unless it equals the type's empty value, in which case return `fallback`.
pub fn resolve<T>(value: T, fallback: T) -> T
where
    T: Default + PartialEq,
{
    if value == T::default() {
        fallback
    } else {
        value
    }
}

/// Effective container image for a spec value.
pub fn image(value: &str) -> String {
    resolve(value.to_string(), DEFAULT_IMAGE.to_string())
}

/// Effective storage class for a spec value.
pub fn storage_class(value: &str) -> String {
    resolve(value.to_string(), DEFAULT_STORAGE_CLASS.to_string())
}

/// Effective volume capacity for a spec value.
pub fn storage_size(value: &str) -> Quantity {
    resolve(
        Quantity(value.to_string()),
        Quantity(DEFAULT_STORAGE_SIZE.to_string()),
    )
}
