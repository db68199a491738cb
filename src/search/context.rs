//! Cooperative cancellation of a running search

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Nodes between clock reads
const CLOCK_INTERVAL: u64 = 256;

/// A deadline and a flag that may be set from another thread.
/// Cloned contexts share the flag.
#[derive(Clone, Debug, Default)]
pub struct SearchContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    polls: u64,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        SearchContext {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A handle that cancels this context when set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the deadline has passed, checking the clock unconditionally
    pub fn is_expired(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Polled once per node. Only reads the clock every few hundred calls.
    pub fn is_cancelled(&mut self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        self.polls += 1;
        if self.polls % CLOCK_INTERVAL != 0 {
            return false;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_handle_is_shared_test() {
        let mut ctx = SearchContext::new();
        let clone = ctx.clone();
        assert!(!ctx.is_cancelled());
        clone.cancel_handle().store(true, Ordering::Relaxed);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn expired_deadline_test() {
        let mut ctx = SearchContext::with_deadline(Instant::now());
        assert!(ctx.is_expired());
        assert!((0..CLOCK_INTERVAL).any(|_| ctx.is_cancelled()));
    }
}
