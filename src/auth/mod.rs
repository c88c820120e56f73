//! OAuth client-credentials flow and bearer token handling.

pub mod client_credentials;
pub mod error;
pub mod token;

pub use client_credentials::{fetch_token, Credentials, TokenSource};
pub use error::AuthError;
pub use token::AccessToken;
