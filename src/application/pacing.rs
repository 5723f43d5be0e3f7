//! Pacing between consecutive members of a guild sync

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::infrastructure::config::{PacingConfig, PacingStrategy};

pub enum Pacer {
    Fixed(Duration),
    TokenBucket(RateLimiter<NotKeyed, InMemoryState, DefaultClock>),
    Disabled,
}

impl Pacer {
    pub fn from_config(config: &PacingConfig) -> Self {
        match config.strategy {
            PacingStrategy::Fixed => Self::Fixed(Duration::from_millis(config.interval_ms)),
            PacingStrategy::TokenBucket => {
                match (NonZeroU32::new(config.members_per_minute), NonZeroU32::new(config.burst)) {
                    (Some(per_minute), Some(burst)) => {
                        Self::TokenBucket(RateLimiter::direct(Quota::per_minute(per_minute).allow_burst(burst)))
                    }
                    // Rejected by config validation; fall back to the fixed interval
                    _ => Self::Fixed(Duration::from_millis(config.interval_ms)),
                }
            }
            PacingStrategy::Disabled => Self::Disabled,
        }
    }

    /// Wait before the next member; `false` when cancelled during the wait
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        match self {
            Self::Fixed(interval) if interval.is_zero() => !cancel.is_cancelled(),
            Self::Fixed(interval) => {
                debug!("Pacing {}ms before next member", interval.as_millis());
                tokio::select! {
                    () = tokio::time::sleep(*interval) => true,
                    () = cancel.cancelled() => false,
                }
            }
            Self::TokenBucket(limiter) => {
                tokio::select! {
                    () = limiter.until_ready() => true,
                    () = cancel.cancelled() => false,
                }
            }
            Self::Disabled => !cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fixed_interval_sleeps() {
        let pacer = Pacer::from_config(&PacingConfig::default());
        let started = Instant::now();
        assert!(pacer.wait(&CancellationToken::new()).await);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_wait() {
        let pacer = Pacer::Fixed(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        assert!(!pacer.wait(&cancel).await);
    }

    #[tokio::test]
    async fn token_bucket_allows_burst() {
        let pacer = Pacer::from_config(&PacingConfig {
            strategy: PacingStrategy::TokenBucket,
            members_per_minute: 60,
            burst: 3,
            ..PacingConfig::default()
        });
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            assert!(pacer.wait(&cancel).await);
        }
    }

    #[tokio::test]
    async fn disabled_pacing_reports_cancellation() {
        let cancel = CancellationToken::new();
        assert!(Pacer::Disabled.wait(&cancel).await);
        cancel.cancel();
        assert!(!Pacer::Disabled.wait(&cancel).await);
    }
}
