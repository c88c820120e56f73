//! Conversation transcript and the bounded model-context window.

use serde::{Deserialize, Serialize};

/// Speaker of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One transcript entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only conversation transcript.
///
/// The displayed transcript is unbounded; the model only ever sees the
/// trailing window returned by [`context_window`](Self::context_window).
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Trailing window of at most `k` complete user/assistant exchanges.
    ///
    /// An in-flight user turn with no reply yet is not part of any complete
    /// exchange and is excluded.
    pub fn context_window(&self, k: usize) -> &[Turn] {
        let mut end = self.turns.len();
        if self.turns.last().map(|t| t.role) == Some(Role::User) {
            end -= 1;
        }
        let start = end.saturating_sub(2 * k);
        &self.turns[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchanges(transcript: &mut Transcript, n: usize) {
        for i in 0..n {
            transcript.push(Turn::user(format!("q{i}")));
            transcript.push(Turn::assistant(format!("a{i}")));
        }
    }

    #[test]
    fn window_of_empty_transcript_is_empty() {
        let transcript = Transcript::new();
        assert!(transcript.context_window(3).is_empty());
    }

    #[test]
    fn window_caps_at_k_exchanges() {
        let mut transcript = Transcript::new();
        exchanges(&mut transcript, 10);

        let window = transcript.context_window(3);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "q7");
        assert_eq!(window[5].content, "a9");
    }

    #[test]
    fn window_excludes_in_flight_user_turn() {
        let mut transcript = Transcript::new();
        exchanges(&mut transcript, 2);
        transcript.push(Turn::user("pending"));

        let window = transcript.context_window(3);
        assert_eq!(window.len(), 4);
        assert!(window.iter().all(|t| t.content != "pending"));
    }

    #[test]
    fn window_shorter_than_k_returns_everything_complete() {
        let mut transcript = Transcript::new();
        exchanges(&mut transcript, 1);

        let window = transcript.context_window(3);
        assert_eq!(window.len(), 2);
    }
}
