//! Cancellation of merge passes
//!
//! A pass is cancelled either explicitly (SIGINT from the CLI, or a caller
//! that lost interest) or by its deadline running out. The token is cheap to
//! clone; all clones share one flag.
//!
//! Checks happen at dataset-group granularity: a `resolve_batch` call already
//! in flight is allowed to finish, its result is then discarded.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a pass stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    #[error("merge cancelled")]
    Requested,

    #[error("merge timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

/// What the signal handler should do for the n-th interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First interrupt: stop the pass at the next check
    Cancel,
    /// Second interrupt: the user does not want to wait
    Exit,
    Ignore,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    signals: AtomicU8,
}

/// Shared cancellation flag with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
    deadline: Option<(Instant, Duration)>,
}

impl CancelToken {
    /// A token that only cancels when asked to
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            state: Arc::default(),
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// Same flag, new deadline. `None` keeps the token open-ended.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        }
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// `Err` once the flag is set or the deadline has passed
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.state.cancelled.load(Ordering::SeqCst) {
            return Err(Cancelled::Requested);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => Err(Cancelled::TimedOut(timeout)),
            _ => Ok(()),
        }
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|(at, _)| at.saturating_duration_since(Instant::now()))
    }

    /// Record an interrupt and decide what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        match self.state.signals.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::Exit,
            _ => SignalAction::Ignore,
        }
    }

    /// Cancel this token on SIGINT/SIGTERM. Call once per process.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || match token.handle_signal() {
            SignalAction::Cancel => {
                tracing::warn!("interrupt received, cancelling merge");
            }
            SignalAction::Exit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(130);
            }
            SignalAction::Ignore => {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_fresh_token_is_open() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        assert!(token.remaining().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert_eq!(token.check(), Err(Cancelled::Requested));
    }

    #[test]
    fn test_deadline_expires() {
        let token = CancelToken::with_timeout(Duration::from_millis(10));
        assert!(!token.is_cancelled());
        sleep(Duration::from_millis(30));
        assert_eq!(
            token.check(),
            Err(Cancelled::TimedOut(Duration::from_millis(10)))
        );
    }

    #[test]
    fn test_child_shares_flag() {
        let parent = CancelToken::new();
        let child = parent.child(Some(Duration::from_secs(60)));
        assert!(child.remaining().is_some());
        parent.cancel();
        assert_eq!(child.check(), Err(Cancelled::Requested));
    }

    #[test]
    fn test_signal_sequence() {
        let token = CancelToken::new();
        assert_eq!(token.handle_signal(), SignalAction::Cancel);
        assert!(token.is_cancelled());
        assert_eq!(token.handle_signal(), SignalAction::Exit);
        assert_eq!(token.handle_signal(), SignalAction::Ignore);
    }
}
