// [libs/core/rate-governor/src/sliding_window.rs]
/*!
 * =================================================================
 * APARATO: SLIDING WINDOW LIMITER
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L2)
 * RESPONSABILIDAD: "A LO SUMO K SOLICITUDES EN LOS ÚLTIMOS W SEGUNDOS"
 * =================================================================
 */

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::limiter::{AcquireOutcome, RateLimiter};

pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
        }
    }

    fn evict_stale(timestamps: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn acquire(&self, cost: u32, deadline: Duration) -> AcquireOutcome {
        let started_waiting_at = Instant::now();

        loop {
            let mut timestamps = self.timestamps.lock().await;
            let now = Instant::now();
            Self::evict_stale(&mut timestamps, self.window, now);

            if timestamps.len() as u32 + cost <= self.max_requests {
                for _ in 0..cost {
                    timestamps.push_back(now);
                }
                return AcquireOutcome::Permit;
            }

            let retry_after = timestamps
                .front()
                .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
                .unwrap_or(self.window);
            drop(timestamps);

            if started_waiting_at.elapsed() + retry_after > deadline {
                return AcquireOutcome::Deny { retry_after };
            }

            sleep(retry_after.min(Duration::from_millis(50)).max(Duration::from_millis(1)))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_capacity_then_denies_within_window() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));

        assert_eq!(
            limiter.acquire(1, Duration::from_millis(0)).await,
            AcquireOutcome::Permit
        );
        assert_eq!(
            limiter.acquire(1, Duration::from_millis(0)).await,
            AcquireOutcome::Permit
        );

        match limiter.acquire(1, Duration::from_millis(0)).await {
            AcquireOutcome::Deny { .. } => {}
            AcquireOutcome::Permit => panic!("expected third request to be denied"),
        }
    }
}
