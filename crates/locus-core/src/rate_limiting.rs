//! Rate limiting utilities for Locus
//!
//! Provides a per-provider token bucket kept in process memory. Quotas are
//! expressed per minute and refill continuously.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::traits::TokenGate;
use crate::types::Provider;

/// Absorbs float drift so a bucket refilled for exactly one interval grants a token.
const TOKEN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    pub capacity: u32,
    pub tokens: f64,
    pub refill_per_second: f64,
    pub last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket refilling `capacity` tokens per minute.
    pub fn per_minute(capacity: u32) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_per_second: capacity as f64 / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_second).min(self.capacity as f64);
        self.last_refill = now;
    }

    pub fn try_take(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<Provider, TokenBucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        config
            .providers
            .iter()
            .fold(Self::new(), |limiter, (provider, settings)| {
                limiter.with_quota(*provider, settings.requests_per_minute)
            })
    }

    pub fn with_quota(self, provider: Provider, requests_per_minute: u32) -> Self {
        self.buckets
            .lock()
            .insert(provider, TokenBucket::per_minute(requests_per_minute));
        self
    }

    /// Takes one token for `provider`. Providers without a quota are never limited.
    pub fn try_acquire(&self, provider: Provider) -> bool {
        match self.buckets.lock().get_mut(&provider) {
            Some(bucket) => bucket.try_take(),
            None => true,
        }
    }

    pub fn available(&self, provider: Provider) -> Option<f64> {
        let mut buckets = self.buckets.lock();
        buckets.get_mut(&provider).map(|bucket| {
            bucket.refill(Instant::now());
            bucket.tokens
        })
    }
}

#[async_trait]
impl TokenGate for RateLimiter {
    async fn try_acquire(&self, provider: Provider) -> bool {
        RateLimiter::try_acquire(self, provider)
    }
}
