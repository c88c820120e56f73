use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token for the tool endpoint.
///
/// `expires_at` is derived from the token endpoint's `expires_in` field
/// when present; tokens supplied directly through configuration have no
/// known expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Token with no known expiry.
    pub fn opaque(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Whether the token is past its expiry, if one is known.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}
