//! Error types for the selection engine.
//!
//! Configuration problems are reported as [`ValidationError`] before any
//! replication is submitted. Missing host data aborts a run part-way
//! through. User cancellation is not an error; it is reported through
//! [`crate::outcome::Termination::Cancelled`].

use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Fatal errors that abort a selection run.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("host has no value of response '{response}' for scenario '{scenario}' replication {replication}")]
    MissingReplicationValue {
        scenario: String,
        response: String,
        replication: usize,
    },

    #[error("host has no value of response '{response}' for scenario '{scenario}'")]
    MissingResponseValue { scenario: String, response: String },
}

impl SelectionError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
