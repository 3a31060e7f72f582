// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Integration tests for orderer-operator
//!
//! These tests require a running Kubernetes cluster accessible via kubeconfig.
//! Tests are marked with #[ignore] and must be run explicitly:
//!
//! ```bash
//! # Run all integration tests (parallel execution supported)
//! cargo test --test integration -- --ignored
//!
//! # Run specific test
//! cargo test --test integration test_orderer_creates_children -- --ignored
//! ```
//!
//! The tests use your existing kubeconfig (~/.kube/config or KUBECONFIG env var).
//!
//! ## Design Principles
//!
//! - **Parallel Test Execution**: Each test creates its own namespace and scoped
//!   operator, enabling concurrent test runs without interference
//! - **RAII Cleanup**: TestNamespace implements Drop for automatic cleanup even on panic
//! - **Watch-Based Waiting**: Uses kube-rs watches for efficient resource detection

// Shared test fixtures (used by functional and integration tests)
#[path = "../common/mod.rs"]
mod common;

mod wait;


pub use cluster::*;
pub use namespace::*;
pub use operator::*;
pub use wait::*;
