//! Progress events and cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness notifications emitted while bands are resampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    BandStarted { index: usize, total: usize },
    BandCompleted { index: usize, total: usize },
}

/// Receiver of progress events
pub trait ProgressListener {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

impl<F: Fn(ProgressEvent)> ProgressListener for F {
    fn on_event(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Shared flag asking a running reprojection to stop at the next band boundary
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_listener() {
        let seen = RefCell::new(Vec::new());
        let listener = |event: ProgressEvent| seen.borrow_mut().push(event);
        listener.on_event(ProgressEvent::BandStarted { index: 1, total: 2 });
        assert_eq!(seen.into_inner(), vec![ProgressEvent::BandStarted { index: 1, total: 2 }]);
    }

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }
}
