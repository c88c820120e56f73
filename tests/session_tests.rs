//! Session lifecycle and turn-processing tests with a scripted runtime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use casa::agent::{AgentError, AgentFactory, AgentRuntime, Role, Turn};
use casa::error::{CasaError, CleanupError};
use casa::session::{ChatSession, SessionState};
use pretty_assertions::assert_eq;

/// Scripted runtime: echoes queries and records every context it was
/// handed, so tests can assert on the bounded window.
struct EchoRuntime {
    contexts: Arc<Mutex<Vec<Vec<Turn>>>>,
    fail_run: bool,
    fail_close: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl AgentRuntime for EchoRuntime {
    async fn run(&mut self, query: &str, context: &[Turn]) -> Result<String, AgentError> {
        if self.fail_run {
            return Err(AgentError::InvalidResponse("model unavailable".into()));
        }
        self.contexts.lock().unwrap().push(context.to_vec());
        Ok(format!("Echo: {query}"))
    }

    async fn close(&mut self) -> Result<(), CleanupError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(CleanupError::new("session teardown exploded"));
        }
        Ok(())
    }
}

#[derive(Clone)]
struct EchoFactory {
    builds: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<Vec<Turn>>>>,
    fail_run: bool,
    fail_close: bool,
    closed: Arc<AtomicUsize>,
}

impl EchoFactory {
    fn new() -> Self {
        Self {
            builds: Arc::new(AtomicUsize::new(0)),
            contexts: Arc::new(Mutex::new(Vec::new())),
            fail_run: false,
            fail_close: false,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::new()
        }
    }

    fn failing_run() -> Self {
        Self {
            fail_run: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl AgentFactory for EchoFactory {
    async fn build(&self) -> Result<Box<dyn AgentRuntime>, CasaError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EchoRuntime {
            contexts: self.contexts.clone(),
            fail_run: self.fail_run,
            fail_close: self.fail_close,
            closed: self.closed.clone(),
        }))
    }
}

#[tokio::test]
async fn echo_turn_end_to_end() {
    let factory = EchoFactory::new();
    let mut session = ChatSession::new(Box::new(factory));

    let reply = session
        .process_turn("Which communities are near Miami?")
        .await
        .expect("turn");

    assert_eq!(reply, "Echo: Which communities are near Miami?");
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0], Turn::user("Which communities are near Miami?"));
    assert_eq!(
        transcript[1],
        Turn::assistant("Echo: Which communities are near Miami?")
    );
}

#[tokio::test]
async fn transcript_alternates_in_call_order() {
    let factory = EchoFactory::new();
    let mut session = ChatSession::new(Box::new(factory));

    for i in 0..4 {
        session.process_turn(&format!("q{i}")).await.expect("turn");
    }

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 8);
    for (i, turn) in transcript.iter().enumerate() {
        let exchange = i / 2;
        if i % 2 == 0 {
            assert_eq!(turn.role, Role::User);
            assert_eq!(turn.content, format!("q{exchange}"));
        } else {
            assert_eq!(turn.role, Role::Assistant);
            assert_eq!(turn.content, format!("Echo: q{exchange}"));
        }
    }
}

#[tokio::test]
async fn context_window_never_exceeds_three_exchanges() {
    let factory = EchoFactory::new();
    let contexts = factory.contexts.clone();
    let mut session = ChatSession::new(Box::new(factory));

    for i in 0..10 {
        session.process_turn(&format!("q{i}")).await.expect("turn");
    }
    assert_eq!(session.transcript().len(), 20);

    let contexts = contexts.lock().unwrap();
    assert!(contexts.iter().all(|c| c.len() <= 6));

    // The tenth turn sees exactly the seventh through ninth exchanges.
    let last = contexts.last().unwrap();
    assert_eq!(last.len(), 6);
    assert_eq!(last[0], Turn::user("q6"));
    assert_eq!(last[5], Turn::assistant("Echo: q8"));
}

#[tokio::test]
async fn ensure_active_is_idempotent() {
    let factory = EchoFactory::new();
    let builds = factory.builds.clone();
    let mut session = ChatSession::new(Box::new(factory));

    assert_eq!(session.state(), SessionState::Uninitialized);
    session.ensure_active().await.expect("activate");
    session.ensure_active().await.expect("re-activate");
    session.process_turn("hello").await.expect("turn");

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reset_closes_and_next_turn_rebuilds_fresh() {
    let factory = EchoFactory::new();
    let builds = factory.builds.clone();
    let closed = factory.closed.clone();
    let contexts = factory.contexts.clone();
    let mut session = ChatSession::new(Box::new(factory));

    session.process_turn("before reset").await.expect("turn");
    session.process_turn("still before").await.expect("turn");

    session.reset().await.expect("reset");
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.transcript().is_empty());
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    session.process_turn("after reset").await.expect("turn");
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(session.transcript().len(), 2);

    // The fresh session starts with empty history.
    assert!(contexts.lock().unwrap().last().unwrap().is_empty());
}

#[tokio::test]
async fn reset_survives_failing_cleanup() {
    let factory = EchoFactory::failing_close();
    let builds = factory.builds.clone();
    let mut session = ChatSession::new(Box::new(factory));

    session.process_turn("hello").await.expect("turn");

    let err = session.reset().await.expect_err("cleanup failure surfaced");
    assert!(err.to_string().contains("session teardown exploded"));

    // State is torn down regardless.
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.transcript().is_empty());

    let reply = session.process_turn("again").await.expect("turn");
    assert_eq!(reply, "Echo: again");
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn reset_before_activation_is_noop() {
    let factory = EchoFactory::new();
    let builds = factory.builds.clone();
    let closed = factory.closed.clone();
    let mut session = ChatSession::new(Box::new(factory));

    session.reset().await.expect("noop reset");
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(builds.load(Ordering::SeqCst), 0);
    assert_eq!(closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn agent_failure_keeps_user_turn_and_propagates() {
    let factory = EchoFactory::failing_run();
    let mut session = ChatSession::new(Box::new(factory));

    let err = session.process_turn("doomed").await.expect_err("run fails");
    assert!(matches!(err, CasaError::Agent(_)));

    // The user turn was recorded; no assistant turn was fabricated.
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0], Turn::user("doomed"));
    assert_eq!(session.state(), SessionState::Active);
}
