//! casa — conversational front-end for real-estate community search.
//!
//! Acquires an OAuth bearer token via the client-credentials flow, builds
//! the MCP tool-endpoint configuration, and drives a tool-augmented chat
//! agent one blocking turn at a time.
//!
//! # Quick Start
//!
//! ```no_run
//! use casa::agent::{CommunityAgentFactory, ModelSettings};
//! use casa::config::Secrets;
//! use casa::session::ChatSession;
//!
//! # async fn example() -> casa::error::Result<()> {
//! let secrets = Secrets::from_env()?;
//! let settings = ModelSettings::new(secrets.openai_api_key.clone());
//! let factory = CommunityAgentFactory::new(secrets, settings).await?;
//! let mut session = ChatSession::new(Box::new(factory));
//! let reply = session.process_turn("Which communities are near Miami?").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod session;
pub mod shell;
