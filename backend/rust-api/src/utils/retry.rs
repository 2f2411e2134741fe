use std::future::Future;
use std::time::Duration;

/// Exponential backoff with optional jitter for collaborator calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl RetryPolicy {
    /// Result writes: a lost record cannot be recomputed once the attempt is gone.
    pub fn persist() -> Self {
        Self {
            max_attempts: 7,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(2000),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }

    fn delay(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter) if !jitter.is_zero() => {
                let jitter_ms = jitter.as_millis() as u64;
                backoff + Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
            }
            _ => backoff,
        }
    }

    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        let mut backoff = self.base_backoff;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => return Err(err),
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "retrying after failure");
                    tokio::time::sleep(self.delay(backoff)).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}
