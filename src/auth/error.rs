use thiserror::Error;

/// Errors from the OAuth client-credentials exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token endpoint returned status {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("Invalid token response: {0}")]
    MalformedResponse(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}
