//! Error types for the controller.
//!
//! Defines custom error types with classification for retry behavior.

use std::time::Duration;
use thiserror::Error;

/// Error type for controller operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A bundled template is missing from the catalog or cannot be parsed
    #[error("Failed to load template '{template}': {reason}")]
    TemplateLoad { template: String, reason: String },

    /// A bundled template does not have the shape of the requested object
    #[error("Template '{template}' is not a valid {expected}: {reason}")]
    SchemaMismatch {
        template: String,
        expected: String,
        reason: String,
    },

    /// Missing required field in resource
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Validation error in resource spec
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Build a template load error
    pub fn template_load(template: &str, reason: impl Into<String>) -> Self {
        Error::TemplateLoad {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a schema mismatch error
    pub fn schema_mismatch(template: &str, expected: &str, reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            template: template.to_string(),
            expected: expected.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if this error should be retried
    ///
    /// Template errors cannot heal without a new binary, but they are still
    /// requeued so that a fixed catalog is picked up without a new event.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                // Retry on network errors, conflicts, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err)
                        if api_err.code >= 500 || api_err.code == 429 || api_err.code == 409
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::TemplateLoad { .. } | Error::SchemaMismatch { .. } => true,
            Error::Validation(_) | Error::MissingField(_) => false,
        }
    }

    /// Get the recommended requeue duration for this error
    pub fn requeue_after(&self) -> Duration {
        if self.is_retryable() {
            Duration::from_secs(30)
        } else {
            // Needs a spec change, which triggers a new reconcile anyway
            Duration::from_secs(300)
        }
    }
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;
