//! Timeout and rate-limit handling around one provider
//!
//! `query` never fails. Every result of the upstream call, including retries,
//! exhaustion and expiry of the time budget, is folded into a `ProviderOutcome`.

use std::sync::Arc;
use std::time::Duration;

use locus_core::{EngineConfig, GeoPoint, PlaceProvider, Provider, ProviderOutcome, TokenGate};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

pub struct GuardedProvider {
    inner: Arc<dyn PlaceProvider>,
    retry: Arc<RetryPolicy>,
    timeout: Duration,
    rate_limit_cooldown: Duration,
}

impl GuardedProvider {
    pub fn new(
        inner: Arc<dyn PlaceProvider>,
        retry: Arc<RetryPolicy>,
        timeout: Duration,
        rate_limit_cooldown: Duration,
    ) -> Self {
        Self {
            inner,
            retry,
            timeout,
            rate_limit_cooldown,
        }
    }

    pub fn from_config(
        inner: Arc<dyn PlaceProvider>,
        retry: Arc<RetryPolicy>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(
            inner,
            retry,
            config.provider_timeout(),
            config.rate_limit_cooldown(),
        )
    }

    pub fn provider(&self) -> Provider {
        self.inner.provider()
    }

    pub async fn query(&self, point: GeoPoint) -> ProviderOutcome {
        self.call_until(Instant::now() + self.timeout, point).await
    }

    /// Like `query`, but asks `gate` for a token first. Admission shares the
    /// same deadline as the call, and a gate that does not answer in time
    /// counts as a denial.
    pub async fn query_gated(&self, gate: &dyn TokenGate, point: GeoPoint) -> ProviderOutcome {
        let provider = self.provider();
        let deadline = Instant::now() + self.timeout;
        match timeout_at(deadline, gate.try_acquire(provider)).await {
            Ok(true) => self.call_until(deadline, point).await,
            Ok(false) => ProviderOutcome::Throttled,
            Err(_) => {
                warn!(%provider, "rate gate did not answer before the deadline");
                ProviderOutcome::Throttled
            }
        }
    }

    async fn call_until(&self, deadline: Instant, point: GeoPoint) -> ProviderOutcome {
        let provider = self.provider();
        let attempt = async {
            match self.retry.run(|| self.inner.nearest(point)).await {
                Ok(Some(hit)) => ProviderOutcome::Hit(hit),
                Ok(None) => ProviderOutcome::NoMatch,
                Err(err) if err.is_rate_limited() => {
                    warn!(%provider, "provider is rate limiting us; cooling down");
                    sleep(self.rate_limit_cooldown).await;
                    ProviderOutcome::RateLimited
                }
                Err(err) => {
                    warn!(%provider, %err, "provider call failed");
                    ProviderOutcome::Unavailable(err.to_string())
                }
            }
        };

        match timeout_at(deadline, attempt).await {
            Ok(outcome) => {
                debug!(%provider, outcome = outcome.label(), "provider call finished");
                outcome
            }
            Err(_) => {
                warn!(%provider, timeout_ms = self.timeout.as_millis() as u64, "provider call timed out");
                ProviderOutcome::TimedOut
            }
        }
    }
}
