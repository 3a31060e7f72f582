//! Controller module for orderer-operator.
//!
//! Contains the reconciliation loop, event routing, cluster state access,
//! error handling, requeue backoff, and spec validation.

pub mod backoff;
pub mod context;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod store;
pub mod validation;
