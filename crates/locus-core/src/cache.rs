//! Short-lived store of resolved grid cells
//!
//! Entries expire after a fixed TTL and the cache holds a bounded number of
//! cells, evicting the least valuable entries once full.

use moka::future::Cache;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::types::{CacheKey, VenueClassification};

#[derive(Clone)]
pub struct ResultCache {
    entries: Cache<CacheKey, VenueClassification>,
}

impl ResultCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cache_max_entries, config.cache_ttl())
    }

    pub async fn get(&self, key: &CacheKey) -> Option<VenueClassification> {
        self.entries.get(key).await
    }

    pub async fn put(&self, key: CacheKey, value: VenueClassification) {
        self.entries.insert(key, value).await;
    }

    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
