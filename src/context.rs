use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// Context handed to every phase method.
///
/// Wraps a cancellation token and an optional deadline. Phase
/// implementations are expected to watch [`PhaseContext::cancelled`] and
/// return promptly once it fires; nothing is force-terminated.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl PhaseContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Context that is never cancelled by anyone but its holder
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Derive a child context cancelled when `timeout` elapses, when this
    /// context is cancelled, or when the returned guard is dropped.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> (PhaseContext, DropGuard) {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = self.deadline {
            deadline = deadline.min(parent_deadline);
        }

        let token = self.token.child_token();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });

        let guard = token.clone().drop_guard();
        (
            PhaseContext {
                token,
                deadline: Some(deadline),
            },
            guard,
        )
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
