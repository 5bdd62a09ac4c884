//! Call Context Module
//!
//! A cancellable context passed to every adapter operation. The memory
//! adapter completes without looking at it; networked adapters use it to
//! abort in-flight work.

use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, Result};

// == Context ==
/// Cancellable call context carried by a [`Cache`](crate::Cache) handle.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// Returns a context that is never cancelled unless `cancel` is called on it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context from an existing cancellation token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Derives a child context. Cancelling the parent cancels the child,
    /// cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    // == Check ==
    /// Returns `CacheError::Cancelled` once the context has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(CacheError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Returns the underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
