//! Exponential backoff with jitter for provider calls

use std::future::Future;
use std::time::Duration;

use locus_core::{ProviderError, RetrySettings};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::sleep;
use tracing::warn;

const MAX_EXPONENT: u32 = 10;

pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
    jitter_rng: Mutex<StdRng>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
            jitter_rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
            Duration::from_millis(settings.max_jitter_ms),
        )
    }

    /// Replaces the jitter source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.jitter_rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let base = self.base_delay * (1 << exponent);
        let jitter_ms = {
            let mut rng = self.jitter_rng.lock();
            rng.gen_range(0..=self.max_jitter.as_millis() as u64)
        };
        base + Duration::from_millis(jitter_ms)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(%err, attempt, "provider call failed; retrying after {:?}", delay);
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
