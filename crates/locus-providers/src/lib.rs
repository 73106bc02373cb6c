//! Place-data provider adapters for Locus
//!
//! Each adapter speaks one upstream API and implements `PlaceProvider`.
//! `GuardedProvider` wraps an adapter with retries, a hard timeout and the
//! 429 cooldown, turning every call into a `ProviderOutcome`.

use std::sync::Arc;

use locus_core::{LocusError, PlaceProvider, Provider, ProviderSettings};

#[cfg(feature = "foursquare")]
pub mod foursquare;
#[cfg(feature = "google")]
pub mod google;
pub mod guard;
mod http;
pub mod retry;

#[cfg(feature = "foursquare")]
pub use foursquare::FoursquareProvider;
#[cfg(feature = "google")]
pub use google::GoogleProvider;
pub use guard::GuardedProvider;
pub use http::normalize_categories;
pub use retry::RetryPolicy;

/// Builds the adapter for `provider` from its settings.
pub fn build_provider(
    provider: Provider,
    settings: &ProviderSettings,
) -> Result<Arc<dyn PlaceProvider>, LocusError> {
    match provider {
        #[cfg(feature = "foursquare")]
        Provider::Foursquare => Ok(Arc::new(FoursquareProvider::new(settings)?)),
        #[cfg(feature = "google")]
        Provider::Google => Ok(Arc::new(GoogleProvider::new(settings)?)),
        #[allow(unreachable_patterns)]
        other => Err(LocusError::Config(format!(
            "provider '{}' is not enabled in this build",
            other
        ))),
    }
}
