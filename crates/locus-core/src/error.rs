//! Error handling for Locus
//!
//! `LocusError` covers construction and configuration problems. Failures of a
//! single upstream call are modelled separately by `ProviderError`, which never
//! reaches the caller of `classify`.

use thiserror::Error;

/// The main error type for Locus
#[derive(Error, Debug)]
pub enum LocusError {
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Unknown provider: '{0}'")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Redis error")]
    Redis(#[from] redis::RedisError),
}

/// Failure of one attempt against an upstream provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Only throttling and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Status(status) if *status == 429 || (500..=599).contains(status))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Status(429))
    }
}
