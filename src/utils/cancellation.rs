//! Cooperative cancellation for in-flight resolutions.

use std::sync::{Arc, OnceLock};

/// Shared cancellation flag. Clones observe the same state.
///
/// Cancellation is idempotent: only the first reason is kept. The engine
/// checks the token before every network call, never in the middle of a parse.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    reason: Arc<OnceLock<String>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: impl Into<String>) {
        if self.reason.set(reason.into()).is_ok() {
            tracing::debug!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}
