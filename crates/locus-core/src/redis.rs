//! Redis utilities for Locus
//!
//! Provides a token bucket shared by every instance pointed at the same Redis,
//! for deployments where provider quotas are global rather than per process.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::LocusError;
use crate::traits::TokenGate;
use crate::types::Provider;

pub const RATE_LIMIT_PREFIX: &str = "locus:ratelimit";

const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_per_ms = tonumber(ARGV[2])
local now = tonumber(ARGV[3])

local state = redis.call('HMGET', key, 'tokens', 'ts')
local tokens = tonumber(state[1])
local ts = tonumber(state[2])

if not tokens then
    tokens = capacity
    ts = now
end

tokens = math.min(capacity, tokens + math.max(0, now - ts) * refill_per_ms)

local allowed = 0
if tokens + 1e-6 >= 1 then
    tokens = math.max(0, tokens - 1)
    allowed = 1
end

redis.call('HSET', key, 'tokens', tostring(tokens), 'ts', tostring(now))
redis.call('PEXPIRE', key, 120000)
return allowed
"#;

pub struct RedisRateLimiter {
    manager: ConnectionManager,
    prefix: String,
    quotas: HashMap<Provider, u32>,
}

impl RedisRateLimiter {
    pub async fn new(redis_url: &str) -> Result<Self, LocusError> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            prefix: RATE_LIMIT_PREFIX.to_string(),
            quotas: HashMap::new(),
        })
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        if !prefix.trim().is_empty() {
            self.prefix = prefix.to_string();
        }
        self
    }

    pub fn with_quota(mut self, provider: Provider, requests_per_minute: u32) -> Self {
        self.quotas.insert(provider, requests_per_minute);
        self
    }

    pub fn with_config_quotas(self, config: &EngineConfig) -> Self {
        config
            .providers
            .iter()
            .fold(self, |limiter, (provider, settings)| {
                limiter.with_quota(*provider, settings.requests_per_minute)
            })
    }

    fn bucket_key(&self, provider: Provider) -> String {
        format!("{}:{}", self.prefix, provider)
    }

    async fn take(&self, provider: Provider, capacity: u32) -> Result<bool, LocusError> {
        let mut conn = self.manager.clone();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let refill_per_ms = capacity as f64 / 60_000.0;

        let allowed: i64 = redis::cmd("EVAL")
            .arg(TOKEN_BUCKET_SCRIPT)
            .arg(1)
            .arg(self.bucket_key(provider))
            .arg(capacity)
            .arg(refill_per_ms)
            .arg(now)
            .query_async(&mut conn)
            .await?;

        Ok(allowed == 1)
    }
}

#[async_trait]
impl TokenGate for RedisRateLimiter {
    async fn try_acquire(&self, provider: Provider) -> bool {
        let Some(&capacity) = self.quotas.get(&provider) else {
            return true;
        };
        match self.take(provider, capacity).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(%provider, "Shared rate limit check failed, skipping provider: {}", e);
                false
            }
        }
    }
}
