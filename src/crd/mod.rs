//! Custom Resource Definitions (CRDs) for orderer-operator.
//!
//! - `Orderer`: desired state of a single Fabric ordering node

mod orderer;

pub use orderer::*;
