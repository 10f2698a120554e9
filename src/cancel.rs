//! Cooperative cancellation helpers.

use crate::error::{RecapError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `cancel`, preferring cancellation when both are ready.
pub async fn or_cancelled<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(RecapError::Cancelled),
        output = fut => Ok(output),
    }
}
