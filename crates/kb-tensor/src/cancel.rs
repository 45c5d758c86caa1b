//! Cooperative cancellation for kernel workers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TensorError};

/// Shared, set-once stop flag polled by kernel workers.
///
/// Clones share the same flag. Once cancelled, a token stays cancelled for
/// the rest of its life. Reads and writes use relaxed ordering: workers see
/// the flag eventually, not at any particular iteration.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token nobody holds a second handle to; it never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Creates a token that is already cancelled.
    pub fn cancelled() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Interrupted` for `op` if cancellation was requested.
    #[inline]
    pub fn check(&self, op: &'static str) -> Result<()> {
        if self.is_cancelled() {
            Err(TensorError::Interrupted { op })
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
