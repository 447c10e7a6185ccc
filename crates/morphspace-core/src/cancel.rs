//! Cooperative cancellation.
//!
//! All parallel stages of an iteration run under a shared [`CancelToken`].
//! The token is sampled between stages and inside long loops; in-flight
//! parallel primitives that cannot be interrupted run to completion and the
//! caller rechecks the token on return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one exploration thread.
///
/// Cloning the token is cheap and every clone observes the same flag, so a
/// job manager can hold one clone to cancel a running iteration while the
/// engine holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Irreversible for the lifetime of the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
