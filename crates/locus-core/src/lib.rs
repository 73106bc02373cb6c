//! Core types, traits, and building blocks for Locus
//!
//! This crate contains the data model, configuration, and the provider-agnostic
//! pieces of venue resolution: grid keys, rate limiting, caching, request
//! coalescing and fusion.

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod fusion;
pub mod grid;
pub mod rate_limiting;
pub mod redis;
pub mod traits;
pub mod types;

// Re-exports for convenient access
pub use cache::ResultCache;
pub use coalesce::RequestCoalescer;
pub use config::{EngineConfig, ProviderSettings, RetrySettings};
pub use error::{LocusError, ProviderError};
pub use rate_limiting::RateLimiter;
pub use redis::RedisRateLimiter;
#[cfg(any(test, feature = "test-mocks"))]
pub use traits::MockPlaceProvider;
pub use traits::{PlaceProvider, TokenGate};
pub use types::{
    CacheKey, GeoPoint, Provider, ProviderHit, ProviderOutcome, VenueClassification, VenueType,
};
