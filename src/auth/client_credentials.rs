//! OAuth client-credentials token exchange.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::AuthError;
use super::token::AccessToken;

/// Immutable client credentials supplied at process start.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Exchange client credentials for a bearer token.
///
/// One POST, no retry. A non-success status or a body without an
/// `access_token` field fails with [`AuthError`].
pub async fn fetch_token(
    client: &reqwest::Client,
    credentials: &Credentials,
) -> Result<AccessToken, AuthError> {
    debug!(url = %credentials.token_url, "requesting client-credentials token");

    let response = client
        .post(&credentials.token_url)
        .header("client_id", &credentials.client_id)
        .json(&json!({
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret,
            "grant_type": "client_credentials",
        }))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    let value = parsed
        .access_token
        .ok_or_else(|| AuthError::MalformedResponse("missing `access_token` field".into()))?;

    Ok(AccessToken {
        value,
        expires_at: parsed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs)),
    })
}

/// Where bearer tokens for the tool endpoint come from.
///
/// Either a fixed token taken from configuration, or a client-credentials
/// exchange whose result is cached. The cache means the token is normally
/// fetched once per process; expiry is consulted only when a new session
/// is being built, at which point an expired token is re-fetched.
pub enum TokenSource {
    Static(AccessToken),
    ClientCredentials {
        credentials: Credentials,
        cached: Option<AccessToken>,
    },
}

impl TokenSource {
    /// Use a pre-issued token from configuration.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Static(AccessToken::opaque(value))
    }

    /// Fetch tokens through the client-credentials flow.
    pub fn client_credentials(credentials: Credentials) -> Self {
        Self::ClientCredentials {
            credentials,
            cached: None,
        }
    }

    /// Current token, fetching (or replacing an expired cache) as needed.
    pub async fn token(&mut self, client: &reqwest::Client) -> Result<AccessToken, AuthError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ClientCredentials { credentials, cached } => {
                if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                    return Ok(token.clone());
                }
                let token = fetch_token(client, credentials).await?;
                *cached = Some(token.clone());
                Ok(token)
            }
        }
    }
}
