//! Environment-backed secrets and the tool endpoint descriptor.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::auth::{AccessToken, Credentials, TokenSource};

/// Name the community-search MCP server is registered under.
pub const COMMUNITY_TOOL_NAME: &str = "community-search-tool";

/// Configuration failures. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration variable: {0}")]
    MissingVar(&'static str),
}

/// How the tool-endpoint bearer token is obtained.
#[derive(Debug, Clone)]
pub enum TokenSecrets {
    /// Pre-issued token from `MCP_COMMUNITY_BEARER_TOKEN`; the OAuth
    /// exchange is skipped entirely.
    Bearer(String),
    /// Client-credentials exchange against `OAUTH_URL`.
    OAuth {
        oauth_url: String,
        client_secret: String,
    },
}

/// Secrets and endpoints read once at process start. Immutable.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub client_id: String,
    pub community_api_url: String,
    pub community_api_key: String,
    pub openai_api_key: String,
    pub token: TokenSecrets,
}

impl Secrets {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv(); // missing .env is fine
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        // A pre-issued bearer token replaces the whole OAuth exchange, so
        // the OAuth variables are only required without one.
        let token = match lookup("MCP_COMMUNITY_BEARER_TOKEN") {
            Some(value) => TokenSecrets::Bearer(value),
            None => TokenSecrets::OAuth {
                oauth_url: require("OAUTH_URL")?,
                client_secret: require("CLIENT_SECRET")?,
            },
        };

        Ok(Self {
            client_id: require("CLIENT_ID")?,
            community_api_url: require("MCP_COMMUNITY_API_URL")?,
            community_api_key: require("MCP_COMMUNITY_API_KEY")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            token,
        })
    }

    /// Token source matching these secrets.
    pub fn token_source(&self) -> TokenSource {
        match &self.token {
            TokenSecrets::Bearer(value) => TokenSource::fixed(value.clone()),
            TokenSecrets::OAuth {
                oauth_url,
                client_secret,
            } => TokenSource::client_credentials(Credentials {
                client_id: self.client_id.clone(),
                client_secret: client_secret.clone(),
                token_url: oauth_url.clone(),
            }),
        }
    }
}

/// Descriptor the agent runtime needs to reach the community-search tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub server_name: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// Assemble the tool endpoint descriptor.
///
/// Pure and deterministic: the same secrets and token always produce the
/// same header map.
pub fn build_tool_config(secrets: &Secrets, token: &AccessToken) -> ToolConfig {
    let mut headers = BTreeMap::new();
    headers.insert("client_id".to_string(), secrets.client_id.clone());
    headers.insert(
        "Authorization".to_string(),
        format!("Bearer {}", token.value),
    );
    headers.insert("x-api-key".to_string(), secrets.community_api_key.clone());

    ToolConfig {
        server_name: COMMUNITY_TOOL_NAME.to_string(),
        url: secrets.community_api_url.clone(),
        headers,
    }
}
