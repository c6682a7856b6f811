//! Session-wide media blocking flag.
//!
//! [`BlockingState`] is the only value shared between network-side
//! interception callbacks and the content/UI side. Reads and writes are
//! single atomic operations; consistency within one document comes from the
//! reload-on-toggle protocol in [`crate::browser`], not from locking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the session's blocking flag.
#[derive(Debug, Clone)]
pub struct BlockingState(Arc<AtomicBool>);

impl BlockingState {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

impl Default for BlockingState {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_enabled() {
        assert!(BlockingState::default().get());
    }

    #[test]
    fn test_toggle_returns_new_value() {
        let state = BlockingState::new(true);
        assert!(!state.toggle());
        assert!(!state.get());
        assert!(state.toggle());
        assert!(state.get());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let state = BlockingState::new(false);
        let handle = state.clone();
        handle.set(true);
        assert!(state.get());
    }

    #[test]
    fn test_concurrent_readers_during_toggle() {
        let state = BlockingState::new(true);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let reader = state.clone();
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        let _ = reader.get();
                    }
                });
            }
            for _ in 0..10 {
                state.toggle();
            }
        });
        // Even number of flips.
        assert!(state.get());
    }
}
