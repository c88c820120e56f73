use thiserror::Error;

use crate::mcp::McpError;

/// Failures while driving the agent through a turn.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool endpoint error: {0}")]
    Tool(#[from] McpError),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}
