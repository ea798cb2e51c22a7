//! Error types for configuration and process setup.
//!
//! Row-level failures never surface here; they are absorbed by the pipeline
//! driver. [`JobsiftError`] covers the failures that should stop the process
//! before any work starts.

use thiserror::Error;

/// Setup-time error for jobsift.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum JobsiftError {
    /// Configuration is malformed or semantically invalid.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// No API credential could be resolved.
    #[error("missing credential: set {env_var} or pass --api-key")]
    MissingCredential {
        /// Environment variable that was consulted.
        env_var: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the types crate.
pub type Result<T> = std::result::Result<T, JobsiftError>;
