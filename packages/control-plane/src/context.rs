//! Request context carried by mutations.
//!
//! Mutations take `Option<&RequestContext>`. `None` means the caller has no
//! live request: the operation logs and returns without doing any work.

use std::future::Future;

use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{ControlError, Result};

/// Cancellation scope of one API call, or the root scope of a background task.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
}

impl RequestContext {
    /// A fresh root context that is never cancelled by a request.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that observes an existing token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// A child scope cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels this context when the guard is dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Run one backend step, failing with [`ControlError::Cancelled`] if the
    /// context is cancelled first.
    pub async fn run<F, T>(&self, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ControlError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ControlError::Cancelled),
            result = step => result,
        }
    }
}
