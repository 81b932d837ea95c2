//! Cooperative cancellation for navigation loads
//!
//! Switching shelves starts a new navigation; every load issued for an older
//! navigation observes its token as cancelled and stops before touching the
//! inventory, so a slow response can never overwrite a newer view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag a pending load polls between network round trips
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token nobody can cancel
    pub fn never() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Control handle for a group of tokens
///
/// Dropping the source does not cancel its tokens.
#[derive(Debug, Default)]
pub struct CancellationSource {
    token: CancellationToken,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Issues one token per navigation and cancels the previous ones
#[derive(Debug, Default)]
pub struct Navigator {
    current: Option<CancellationSource>,
    generation: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a navigation, cancelling every load of earlier ones
    pub fn begin(&mut self) -> CancellationToken {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let source = CancellationSource::new();
        let token = source.token();
        self.current = Some(source);
        self.generation += 1;
        token
    }

    /// Cancel the active navigation without starting another
    pub fn cancel_all(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }

    /// Number of navigations started so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_live() {
        let source = CancellationSource::new();
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn test_cancel_reaches_every_clone() {
        let source = CancellationSource::new();
        let t1 = source.token();
        let t2 = t1.clone();
        source.cancel();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[test]
    fn test_dropping_source_keeps_token_live() {
        let source = CancellationSource::new();
        let token = source.token();
        drop(source);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_navigation_cancels_previous_token() {
        let mut nav = Navigator::new();
        let first = nav.begin();
        let second = nav.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(nav.generation(), 2);

        nav.cancel_all();
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_never_token_is_never_cancelled() {
        assert!(!CancellationToken::never().is_cancelled());
    }
}
