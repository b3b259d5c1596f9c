//! Cooperative cancellation
//!
//! A [`CancelToken`] is shared between the thread that owns a piece of work and
//! the threads doing it. Blocking waits should use [`CancelToken::wait_timeout`]
//! instead of sleeping so that they return as soon as cancellation is
//! requested.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cloneable cancellation flag which can also be waited on.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation, waking every thread blocked in `wait_timeout`.
    pub fn cancel(&self) {
        let mut cancelled = match self.inner.cancelled.lock() {
            Ok(c) => c,
            Err(p) => p.into_inner(),
        };
        *cancelled = true;
        self.inner.cv.notify_all();
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        match self.inner.cancelled.lock() {
            Ok(c) => *c,
            Err(p) => *p.into_inner(),
        }
    }

    /// Block for up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` if the full timeout elapsed without cancellation, and
    /// `false` if the token was (or became) cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let mut cancelled = match self.inner.cancelled.lock() {
            Ok(c) => c,
            Err(p) => p.into_inner(),
        };

        // Loop to absorb spurious wakeups
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            cancelled = match self.inner.cv.wait_timeout(cancelled, deadline - now) {
                Ok((c, _)) => c,
                Err(p) => p.into_inner().0,
            };
        }

        false
    }
}
