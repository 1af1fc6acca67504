//! Ordered mutations across two stores.
//!
//! The two stores are never updated atomically. These helpers fix the order:
//! the second step is only polled after the first succeeded, and an optional
//! compensation undoes the first step when the second fails.
//!
//! Futures are lazy, so callers pass the un-awaited store calls directly:
//!
//! ```rust,ignore
//! ordered("pause", keyspace.pause_job(t), store.update_status(t, true, tx)).await?;
//! ```

use std::future::Future;

use tracing::{error, warn};

use crate::error::Result;

/// Run `first`, then `second`. If `first` fails, `second` is dropped without
/// ever being polled.
pub async fn ordered<A, B>(
    label: &str,
    first: impl Future<Output = Result<A>>,
    second: impl Future<Output = Result<B>>,
) -> Result<(A, B)> {
    let a = first.await.map_err(|e| {
        warn!(step = label, error = %e, "first store failed, second store not attempted");
        e
    })?;
    let b = second.await.map_err(|e| {
        warn!(step = label, error = %e, "second store failed after first store succeeded");
        e
    })?;
    Ok((a, b))
}

/// Like [`ordered`], but runs `compensate` when `second` fails.
///
/// The error of `second` is returned either way. A failing compensation is
/// logged and leaves the first store's write in place.
pub async fn ordered_with_compensation<A, B>(
    label: &str,
    first: impl Future<Output = Result<A>>,
    second: impl Future<Output = Result<B>>,
    compensate: impl Future<Output = Result<()>>,
) -> Result<(A, B)> {
    let a = first.await?;
    match second.await {
        Ok(b) => Ok((a, b)),
        Err(e) => {
            warn!(step = label, error = %e, "second store failed, compensating");
            if let Err(undo) = compensate.await {
                error!(step = label, error = %undo, "compensation failed, first store left dirty");
            }
            Err(e)
        }
    }
}
