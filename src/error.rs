//! Error types for casa.

use thiserror::Error;

use crate::agent::AgentError;
use crate::auth::AuthError;
use crate::config::ConfigError;

/// Primary error type for all casa operations.
#[derive(Error, Debug)]
pub enum CasaError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Cleanup error: {0}")]
    Cleanup(#[from] CleanupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Failure while releasing session resources.
///
/// Cleanup is best-effort: callers are expected to log and ignore this
/// rather than abort.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CleanupError {
    pub message: String,
}

impl CleanupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CasaError>;
