use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{GeoPoint, Provider, ProviderHit};

/// One upstream place-data source.
///
/// `nearest` performs exactly one request; retries, timeouts and rate limits
/// are applied by the caller.
#[cfg_attr(any(test, feature = "test-mocks"), mockall::automock)]
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    fn provider(&self) -> Provider;

    async fn nearest(&self, point: GeoPoint) -> Result<Option<ProviderHit>, ProviderError>;
}
