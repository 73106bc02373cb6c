//! Engine configuration
//!
//! An explicit struct handed to the resolver at construction time. Nothing in
//! the engine reads the environment.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::types::Provider;

const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Configuration structure for the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<Provider>,
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderSettings>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "default_rate_limit_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_order: default_provider_order(),
            providers: HashMap::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            provider_timeout_ms: default_provider_timeout_ms(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_provider(mut self, provider: Provider, settings: ProviderSettings) -> Self {
        self.providers.insert(provider, settings);
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }
}

/// Credentials and quota for one provider
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_key: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            base_url: None,
        }
    }

    pub fn with_requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns a truncated hash suffix of the key for safe logging
    pub fn key_id(&self) -> String {
        let hex_hash = hex::encode(Sha256::digest(self.api_key.as_bytes()));
        format!("...{}", &hex_hash[hex_hash.len() - 8..])
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.key_id())
            .field("requests_per_minute", &self.requests_per_minute)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Retry budget for one provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_jitter_ms: 100,
        }
    }
}

fn default_provider_order() -> Vec<Provider> {
    vec![Provider::Foursquare, Provider::Google]
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> u64 {
    10_000
}

fn default_provider_timeout_ms() -> u64 {
    4_500
}

fn default_rate_limit_cooldown_ms() -> u64 {
    250
}

fn default_requests_per_minute() -> u32 {
    DEFAULT_REQUESTS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(
            config.provider_order,
            vec![Provider::Foursquare, Provider::Google]
        );
        assert!(config.providers.is_empty());
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.provider_timeout(), Duration::from_millis(4_500));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.retry.max_jitter_ms, 100);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: EngineConfig = serde_json::from_value(serde_json::json!({
            "provider_order": ["google", "foursquare"],
            "providers": {
                "google": { "api_key": "g-key", "requests_per_minute": 30 }
            },
            "cache_ttl_secs": 60
        }))
        .unwrap();

        assert_eq!(
            config.provider_order,
            vec![Provider::Google, Provider::Foursquare]
        );
        let google = &config.providers[&Provider::Google];
        assert_eq!(google.api_key, "g-key");
        assert_eq!(google.requests_per_minute, 30);
        assert_eq!(google.base_url, None);
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.cache_max_entries, 10_000);
    }

    #[test]
    fn test_provider_settings_debug_hides_key() {
        let settings = ProviderSettings::new("super-secret-key");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains(&settings.key_id()));
        assert_eq!(settings.key_id().len(), 11);
    }
}
