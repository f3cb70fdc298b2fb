//! Helpers shared by the database drivers.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Run a store call with an upper bound on how long it may block.
///
/// Expiry surfaces as a connection error. The in-flight statement is not
/// cancelled server-side; the pooled connection is dropped with the future.
pub async fn with_timeout<T, F>(limit: Duration, context: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::connection(
            format!("timed out after {}s", limit.as_secs_f64()),
            context,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), "fast", async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_with_timeout_expires_as_connection_error() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "slow query", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(SyncError::Connection { context, .. }) => assert_eq!(context, "slow query"),
            other => panic!("expected connection error, got {:?}", other),
        }
    }
}
