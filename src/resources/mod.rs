//! Resource generation module.
//!
//! Materializes the Kubernetes objects owned by an Orderer from bundled
//! templates.
//!
//! ## Resources Generated
//!
//! | Resource | Template | Purpose |
//! |----------|----------|---------|
//! | Service | `orderer service` | Network endpoint for the ordering node |
//! | StatefulSet | `orderer statefulset` | Orderer pod with persistent ledger storage |

pub mod common;
pub mod defaults;
pub mod services;
pub mod statefulset;
pub mod templates;

pub use common::{owner_reference, standard_labels};
pub use services::materialize_service;
pub use statefulset::materialize_statefulset;
pub use templates::TemplateStore;
