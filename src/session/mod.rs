//! Session lifecycle: one agent, one transcript, explicit open and close.
//!
//! `ChatSession` is the caller-owned session context. It is lazily
//! activated on the first turn, processes exactly one turn at a time, and
//! is torn down by an explicit [`reset`](ChatSession::reset) whose cleanup
//! outcome the caller may log and ignore.

use tracing::debug;

use crate::agent::{AgentFactory, AgentRuntime, Transcript, Turn};
use crate::error::{CasaError, CleanupError, Result};

/// Lifecycle states of a [`ChatSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Closed,
}

/// Caller-owned session context holding the one agent instance and its
/// transcript.
///
/// At most one agent exists per session object; activation is guarded by a
/// presence check, never re-entrant construction.
pub struct ChatSession {
    factory: Box<dyn AgentFactory>,
    agent: Option<Box<dyn AgentRuntime>>,
    transcript: Transcript,
    history_window: usize,
    state: SessionState,
}

impl ChatSession {
    /// Exchanges retained as model context.
    pub const DEFAULT_HISTORY_WINDOW: usize = 3;

    pub fn new(factory: Box<dyn AgentFactory>) -> Self {
        Self::with_history_window(factory, Self::DEFAULT_HISTORY_WINDOW)
    }

    pub fn with_history_window(factory: Box<dyn AgentFactory>, history_window: usize) -> Self {
        Self {
            factory,
            agent: None,
            transcript: Transcript::new(),
            history_window,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Display transcript, oldest first.
    pub fn transcript(&self) -> &[Turn] {
        self.transcript.turns()
    }

    /// Build the agent if the session is not already active. Idempotent:
    /// a repeated call on an active session is a no-op.
    pub async fn ensure_active(&mut self) -> Result<()> {
        if self.agent.is_some() {
            return Ok(());
        }
        debug!("activating session");
        self.agent = Some(self.factory.build().await?);
        self.transcript.clear();
        self.state = SessionState::Active;
        Ok(())
    }

    /// Process one user turn: record it, drive the agent, record the reply.
    ///
    /// Strictly sequential; the caller blocks until the agent answers. On
    /// agent failure the user turn stays in the transcript (arrival order
    /// is never rewritten) and the error propagates.
    pub async fn process_turn(&mut self, user_text: &str) -> Result<String> {
        self.ensure_active().await?;

        self.transcript.push(Turn::user(user_text));
        let context: Vec<Turn> = self.transcript.context_window(self.history_window).to_vec();

        let agent = self
            .agent
            .as_mut()
            .ok_or_else(|| CasaError::InvalidState("active session has no agent".into()))?;
        let reply = agent.run(user_text, &context).await?;

        self.transcript.push(Turn::assistant(reply.clone()));
        Ok(reply)
    }

    /// Close the session and drop all of its state.
    ///
    /// The agent's close is always attempted, and the session transitions
    /// to `Closed` with transcript and history cleared even when cleanup
    /// fails; the error is returned so callers can log and move on. A
    /// reset of a session that was never activated is a no-op.
    pub async fn reset(&mut self) -> std::result::Result<(), CleanupError> {
        let Some(mut agent) = self.agent.take() else {
            return Ok(());
        };

        let result = agent.close().await;
        self.transcript.clear();
        self.state = SessionState::Closed;
        if let Err(error) = &result {
            debug!(%error, "session cleanup failed");
        }
        result
    }
}
