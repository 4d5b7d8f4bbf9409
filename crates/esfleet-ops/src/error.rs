//! Error taxonomy for fleet operations.

use crate::multierror::MultiError;
use esfleet_api::{ApiError, ResourceRef};
use thiserror::Error;

/// Errors returned by every operation in this crate.
#[derive(Debug, Error)]
pub enum OpError {
    /// Parameter validation failed; no remote call was made.
    #[error(transparent)]
    Validation(#[from] MultiError),

    /// A pre-read revealed remote state that forbids the operation.
    #[error("{operation}: {reason}")]
    Precondition {
        operation: &'static str,
        reason: String,
    },

    /// Remote-reported, transport or decode failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A tracked plan ended with a step in error.
    #[error("Cluster {resource}: plan failed at step \"{step_id}\": {detail}")]
    PlanFailed {
        resource: ResourceRef,
        step_id: String,
        detail: String,
    },

    /// No plan materialized within the retry budget.
    #[error("Cluster {resource}: plan tracking gave up after {retries} retries")]
    TrackingExhausted { resource: ResourceRef, retries: u32 },

    /// The caller cancelled tracking. The remote plan keeps running.
    #[error("Cluster {resource}: plan tracking cancelled")]
    TrackingCancelled { resource: ResourceRef },

    /// A remote response could not be interpreted.
    #[error("{0}")]
    Response(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpError {
    pub fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        OpError::Precondition {
            operation,
            reason: reason.into(),
        }
    }

    /// The validation messages, when this is a validation failure.
    pub fn validation(&self) -> Option<&MultiError> {
        match self {
            OpError::Validation(merr) => Some(merr),
            _ => None,
        }
    }
}

/// Snapshot-repository configuration parsing failures.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("reader cannot be nil")]
    NilReader,

    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config format: {0}")]
    Format(String),

    #[error("config must not be empty")]
    Empty,

    #[error(transparent)]
    Invalid(#[from] MultiError),
}

/// Result alias used across the operations crate.
pub type Result<T> = std::result::Result<T, OpError>;
