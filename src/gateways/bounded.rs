use crate::error::{PaymentError, Result};
use std::future::Future;
use std::time::Duration;

/// Runs a remote rail call under an explicit bound.
///
/// Every adapter method that performs network I/O goes through here; a call
/// that blows the bound resolves to a typed [`PaymentError::UpstreamTimeoutError`]
/// the caller can act on, never an open-ended wait.
pub async fn call<T, F>(rail: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PaymentError::UpstreamTimeoutError {
            rail: rail.to_string(),
            limit_ms: limit.as_millis() as u64,
        }),
    }
}
