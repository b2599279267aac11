use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::core::shutdown::ShutdownSignal;

/// Returned when the shutdown signal fires before a token is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Token bucket with capacity 1
///
/// One token becomes available every `interval`; callers queue on an async
/// mutex so waiters are served in arrival order. A waiter that is cancelled
/// leaves the token for the next caller.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_token: Mutex<Instant>,
}

impl RateLimiter {
    /// A full bucket: the first call is granted immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_token: Mutex::new(Instant::now()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for a token, consuming it on success.
    pub async fn acquire(&self, shutdown: &ShutdownSignal) -> Result<(), Cancelled> {
        if shutdown.is_cancelled() {
            return Err(Cancelled);
        }

        let mut next_token = tokio::select! {
            guard = self.next_token.lock() => guard,
            _ = shutdown.cancelled() => return Err(Cancelled),
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(Cancelled),
            _ = tokio::time::sleep_until(*next_token) => {}
        }

        *next_token = Instant::now() + self.interval;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shutdown;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_token_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();

        limiter.acquire(&ShutdownSignal::never()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let signal = ShutdownSignal::never();
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire(&signal).await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(4 * 500));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_bucket() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire(&ShutdownSignal::never()).await.unwrap();
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_consumes_no_token() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));
        limiter.acquire(&ShutdownSignal::never()).await.unwrap();
        let token_due = Instant::now() + Duration::from_millis(500);

        let (trigger, signal) = shutdown::channel();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire(&signal).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
        assert_eq!(waiter.await.unwrap(), Err(Cancelled));

        // The token due at `token_due` is still there for the next caller.
        limiter.acquire(&ShutdownSignal::never()).await.unwrap();
        let now = Instant::now();
        assert!(now >= token_due);
        assert!(now - token_due < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn already_cancelled_fails_fast() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let (trigger, signal) = shutdown::channel();
        trigger.cancel();

        assert_eq!(limiter.acquire(&signal).await, Err(Cancelled));
    }
}
