use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token-bucket limiter for outgoing fetches.
///
/// A full bucket allows a burst of `per_minute` requests, after which requests
/// are spaced out at the refill rate.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    capacity: f64,
    per_second: f64,
}

impl RateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let capacity = f64::from(requests.max(1));
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            })),
            capacity,
            per_second: capacity / 60.0,
        }
    }

    /// Take a token, or report how long until one is available.
    async fn take(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / self.per_second))
        }
    }

    /// Wait until a request may be made.
    pub async fn acquire(&self) {
        while let Err(wait) = self.take().await {
            tracing::debug!(
                wait_ms = wait.as_millis(),
                "Rate limit reached, waiting for token"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        self.take().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_exhausted() {
        let limiter = RateLimiter::per_minute(3);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        // 600/min refills one token every 100ms.
        let limiter = RateLimiter::per_minute(600);
        for _ in 0..600 {
            limiter.acquire().await;
        }

        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() >= Duration::from_millis(50));
    }
}
