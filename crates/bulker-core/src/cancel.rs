use std::sync::{Arc, OnceLock};

use bulker_model::TaskId;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why a run was cancelled. Only the first trigger is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Operator interrupt (SIGINT/SIGTERM or an explicit request).
    Interrupt,
    /// An external process of this task failed.
    TaskFailed(TaskId),
}

/// One-shot, run-wide cancellation signal. Never resets.
#[derive(Debug, Clone, Default)]
pub struct RunCancel {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl RunCancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run; returns `true` only for the first trigger.
    pub fn trigger(&self, reason: CancelReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn interrupt(&self) -> bool {
        self.trigger(CancelReason::Interrupt)
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    pub fn is_interrupted(&self) -> bool {
        self.reason() == Some(CancelReason::Interrupt)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reason_wins() {
        let cancel = RunCancel::new();
        assert!(!cancel.is_cancelled());
        assert!(cancel.reason().is_none());

        assert!(cancel.trigger(CancelReason::TaskFailed(TaskId::new(1))));
        assert!(!cancel.interrupt());

        assert!(cancel.is_cancelled());
        assert_eq!(cancel.reason(), Some(CancelReason::TaskFailed(TaskId::new(1))));
        assert!(!cancel.is_interrupted());
    }

    #[tokio::test]
    async fn clones_share_the_signal() {
        let cancel = RunCancel::new();
        let other = cancel.clone();

        let waiter = tokio::spawn(async move { other.cancelled().await });
        assert!(cancel.interrupt());
        waiter.await.unwrap();
        assert!(cancel.is_interrupted());
    }
}
