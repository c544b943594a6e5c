use crate::{MvnloadError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Drives `future` to completion unless `token` fires first.
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(MvnloadError::Cancelled),
        result = future => result,
    }
}
