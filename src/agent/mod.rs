//! Agent runtime: conversation state and the tool-use loop.

pub mod conversation;
pub mod error;
pub mod runtime;

pub use conversation::{Role, Transcript, Turn};
pub use error::AgentError;
pub use runtime::{AgentFactory, AgentRuntime, CommunityAgentFactory, McpAgent, ModelSettings};
