//! Error handling for the ALIE resolver
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.
//!
//! Errors here are terminal for the current invocation: the binary maps any
//! of them to exit status 1. Recoverable situations (ambiguous environment,
//! stale progress) are modeled as resolver outcomes, not errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::steps::{Privilege, StepId};

/// Main error type for the ALIE resolver
#[derive(Error, Debug)]
pub enum AlieError {
    /// IO errors (file operations, child process spawning, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The script implementing a step does not exist at its expected path
    #[error("Step script not found: {}", path.display())]
    MissingScript { path: PathBuf },

    /// A step was selected under the wrong privilege level
    #[error("Step '{step}' must run as {required}, but the current user is {actual}")]
    Privilege {
        step: StepId,
        required: Privilege,
        actual: Privilege,
    },

    /// A step's external script exited non-zero
    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: StepId, code: i32 },

    /// Invalid operator selection in a menu
    #[error("Invalid selection: {0}")]
    Selection(String),

    /// Progress store errors (no writable location, etc.)
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, AlieError>;

// Convenient error constructors
impl AlieError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a selection error
    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}
