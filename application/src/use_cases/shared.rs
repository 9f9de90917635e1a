//! Shared utilities for use cases.
//!
//! Cancellation helpers used by every await point of a chat turn.

use crate::use_cases::chat::ChatError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(ChatError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), ChatError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(ChatError::Cancelled);
    }
    Ok(())
}

/// Await `future` unless the token fires first, in which case the future is
/// dropped and `Err(ChatError::Cancelled)` is returned.
pub(crate) async fn until_cancelled<F>(
    token: &Option<CancellationToken>,
    future: F,
) -> Result<F::Output, ChatError>
where
    F: Future,
{
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ChatError::Cancelled),
            output = future => Ok(output),
        },
        None => Ok(future.await),
    }
}
