use std::{future::Future, time::Duration};

use crate::error::{Result, Stage, WeatherError};

/// Race `future` against a timer.
///
/// Only the wait is bounded; whatever I/O the future started is dropped with
/// it rather than explicitly aborted.
pub async fn with_timeout<T, F>(stage: Stage, after: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(%stage, ?after, "Timed out");
            Err(WeatherError::Timeout { stage, after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let err = with_timeout(Stage::Position, Duration::from_secs(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WeatherError::Timeout { stage: Stage::Position, .. }));
    }

    #[tokio::test]
    async fn passes_through_result() {
        let value = with_timeout(Stage::Permission, Duration::from_secs(8), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = with_timeout::<(), _>(Stage::Permission, Duration::from_secs(8), async {
            Err(WeatherError::location("no provider"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Location unavailable: no provider");
    }
}
