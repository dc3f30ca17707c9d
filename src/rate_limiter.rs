//! Ingestion rate limiting (§4.C).
//!
//! Two strategies selected by the configured rate, mirroring the
//! teacher's `biller.rs` use of `tokio::time::interval` for pacing:
//! a token bucket for high/low extremes and a simple fixed-sleep pacer
//! for the middle band, per §4.C's thresholds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

enum Strategy {
    /// r >= 10 or r < 1: token bucket refilled on a fixed tick.
    TokenBucket {
        capacity: f64,
        tokens: Mutex<f64>,
        tick: Duration,
        refill_per_tick: f64,
        last_refill: Mutex<Instant>,
    },
    /// 1 <= r < 10: pace with a fixed sleep between acquisitions.
    SimplePacing {
        interval: Duration,
        last_acquire: Mutex<Option<Instant>>,
    },
}

pub struct RateLimiter {
    strategy: Arc<Strategy>,
}

impl RateLimiter {
    pub fn new(rate_per_second: f64) -> Self {
        let strategy = if rate_per_second >= 10.0 {
            let tick = Duration::from_millis(100);
            Strategy::TokenBucket {
                capacity: rate_per_second,
                tokens: Mutex::new(rate_per_second),
                tick,
                refill_per_tick: rate_per_second * (tick.as_secs_f64()),
                last_refill: Mutex::new(Instant::now()),
            }
        } else if rate_per_second < 1.0 {
            let tick = Duration::from_millis(1000);
            let refill_per_tick = (rate_per_second * tick.as_secs_f64()).max(f64::MIN_POSITIVE);
            Strategy::TokenBucket {
                capacity: 1.0_f64.max(rate_per_second),
                tokens: Mutex::new(0.0),
                tick,
                refill_per_tick,
                last_refill: Mutex::new(Instant::now()),
            }
        } else {
            let interval_ms = (1000.0 / rate_per_second).round() as u64;
            Strategy::SimplePacing {
                interval: Duration::from_millis(interval_ms.max(1)),
                last_acquire: Mutex::new(None),
            }
        };
        Self {
            strategy: Arc::new(strategy),
        }
    }

    /// Blocks until a slot is available.
    pub async fn acquire(&self) {
        match &*self.strategy {
            Strategy::TokenBucket {
                capacity,
                tokens,
                tick,
                refill_per_tick,
                last_refill,
            } => loop {
                {
                    let mut last = last_refill.lock().await;
                    let elapsed = last.elapsed();
                    if elapsed >= *tick {
                        let ticks = (elapsed.as_secs_f64() / tick.as_secs_f64()).floor();
                        let mut t = tokens.lock().await;
                        *t = (*t + ticks * refill_per_tick).min(*capacity);
                        *last = Instant::now();
                    }
                }
                {
                    let mut t = tokens.lock().await;
                    if *t >= 1.0 {
                        *t -= 1.0;
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            },
            Strategy::SimplePacing {
                interval,
                last_acquire,
            } => {
                let mut last = last_acquire.lock().await;
                if let Some(prev) = *last {
                    let elapsed = prev.elapsed();
                    if elapsed < *interval {
                        tokio::time::sleep(*interval - elapsed).await;
                    }
                }
                *last = Some(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn high_rate_token_bucket_does_not_block_within_capacity() {
        let limiter = RateLimiter::new(50.0);
        let start = StdInstant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn mid_rate_paces_between_acquisitions() {
        let limiter = RateLimiter::new(5.0);
        limiter.acquire().await;
        let start = StdInstant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn low_rate_token_bucket_eventually_yields_a_token() {
        let limiter = RateLimiter::new(0.5);
        let start = StdInstant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
