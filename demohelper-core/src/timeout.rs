//! Deadlines for everything the session waits on.
//!
//! Two budgets exist: a short one for plain command/response round-trips and
//! a long one for waits that block on a person typing into the console.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{ConsoleError, ConsoleResult};

/// Which deadline applies to a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// The game answers on its own (cvar echo, status report, record reply).
    Response,
    /// Someone has to read a prompt and type an answer.
    UserDecision,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    response: Duration,
    user_decision: Duration,
}

impl TimeoutGuard {
    pub fn new(response: Duration, user_decision: Duration) -> Self {
        Self {
            response,
            user_decision,
        }
    }

    pub fn duration_for(&self, kind: WaitKind) -> Duration {
        match kind {
            WaitKind::Response => self.response,
            WaitKind::UserDecision => self.user_decision,
        }
    }

    /// Race `operation` against the deadline for `kind`.
    ///
    /// The loser is dropped. Callers that registered a waiter must expunge it
    /// when this returns a timeout (the session does this through a drop
    /// guard on the waiter ticket).
    pub async fn guard<T, F>(&self, operation: F, label: &str, kind: WaitKind) -> ConsoleResult<T>
    where
        F: Future<Output = ConsoleResult<T>>,
    {
        let limit = self.duration_for(kind);
        let started = Instant::now();

        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(ConsoleError::Timeout {
                label: label.to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
                user_decision: kind == WaitKind::UserDecision,
            }),
        }
    }
}

impl Default for TimeoutGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(30))
    }
}
