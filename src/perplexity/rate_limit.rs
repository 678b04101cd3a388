// Sliding-window rate limiter for upstream calls
// Author: kelexine (https://github.com/kelexine)

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Grants at most `max_requests` slots in any trailing `window`.
///
/// Callers over the limit sleep until the oldest grant leaves the window and
/// then re-check; the lock is never held across the sleep.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            grants: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Wait for a free slot and record it. Returns the instant of the grant.
    pub async fn acquire(&self) -> Instant {
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                self.prune(&mut grants, now);

                if grants.len() < self.max_requests {
                    grants.push_back(now);
                    return now;
                }

                match grants.front() {
                    Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };

            debug!(
                "Rate limit reached ({} per {:?}), waiting {:?}",
                self.max_requests, self.window, wait
            );
            crate::metrics::record_rate_limit_wait(wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of grants still inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let mut grants = self.grants.lock().await;
        self.prune(&mut grants, Instant::now());
        grants.len()
    }

    fn prune(&self, grants: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = grants.front() {
            if now.duration_since(oldest) >= self.window {
                grants.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test(start_paused = true)]
    async fn test_grants_immediately_under_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.acquire().await, start);
        }
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_oldest_to_leave_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.acquire().await;

        let third = limiter.acquire().await;
        assert_eq!(third.duration_since(start), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_empties_over_time() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.in_window().await, 0);
    }

    fn run_paused<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_no_window_exceeds_limit(
            max_requests in 1usize..6,
            window_ms in 50u64..500,
            gaps_ms in proptest::collection::vec(0u64..40, 1..30),
        ) {
            let window = Duration::from_millis(window_ms);
            let grants = run_paused(async {
                let limiter = std::sync::Arc::new(RateLimiter::new(max_requests, window));
                let mut handles = Vec::new();
                for gap in gaps_ms {
                    tokio::time::sleep(Duration::from_millis(gap)).await;
                    let limiter = limiter.clone();
                    handles.push(tokio::spawn(async move { limiter.acquire().await }));
                }
                let mut grants = Vec::new();
                for handle in handles {
                    grants.push(handle.await.unwrap());
                }
                grants.sort();
                grants
            });

            for (i, start) in grants.iter().enumerate() {
                let in_window = grants[i..]
                    .iter()
                    .take_while(|g| g.duration_since(*start) < window)
                    .count();
                prop_assert!(in_window <= max_requests);
            }
        }
    }
}
