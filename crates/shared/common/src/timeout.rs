//! Bounded calls to external dependencies.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Run `fut`, failing with [`AppError::Transient`] if it takes longer than `limit`.
///
/// An elapsed timeout is reported separately from anything the dependency
/// itself returns, so "not found" and "did not answer" never look alike.
pub async fn bounded<T, F>(dependency: &str, limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                dependency = %dependency,
                timeout_ms = limit.as_millis() as u64,
                "Dependency call timed out"
            );
            Err(AppError::transient(dependency))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let result = bounded("store", Duration::from_millis(50), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_inner_error_is_not_rewritten() {
        let result: AppResult<()> =
            bounded("store", Duration::from_millis(50), async { Err(AppError::NotFound) }).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_becomes_transient() {
        let result: AppResult<()> = bounded("session cache", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        match result {
            Err(AppError::Transient(dep)) => assert_eq!(dep, "session cache"),
            other => panic!("expected transient error, got {:?}", other),
        }
    }
}
