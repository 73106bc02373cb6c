//! The venue resolution engine
//!
//! `VenueResolver::classify` maps a coordinate to a grid cell, serves the cell
//! from cache when possible, and otherwise runs one coalesced resolution
//! against every configured provider.

use std::sync::Arc;

use futures_util::future::join_all;
use locus_core::fusion::fuse;
use locus_core::grid::cache_key;
use locus_core::{
    CacheKey, EngineConfig, GeoPoint, LocusError, PlaceProvider, Provider, ProviderHit,
    RateLimiter, RequestCoalescer, ResultCache, TokenGate, VenueClassification,
};
use locus_providers::{build_provider, GuardedProvider, RetryPolicy};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::router::ProviderRouter;
use crate::telemetry::set_venue_attributes;

struct Inner {
    providers: Vec<GuardedProvider>,
    preference: Vec<Provider>,
    gate: Arc<dyn TokenGate>,
    cache: ResultCache,
    coalescer: RequestCoalescer<Option<VenueClassification>>,
}

/// Cheap to clone; clones share cache, limiter and in-flight work.
#[derive(Clone)]
pub struct VenueResolver {
    inner: Arc<Inner>,
}

pub struct VenueResolverBuilder {
    config: EngineConfig,
    router: ProviderRouter,
    providers: Option<Vec<Arc<dyn PlaceProvider>>>,
    gate: Option<Arc<dyn TokenGate>>,
    retry: Option<RetryPolicy>,
}

impl VenueResolverBuilder {
    /// Uses these adapters instead of building them from the configured settings.
    pub fn providers(mut self, providers: Vec<Arc<dyn PlaceProvider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn rate_gate(mut self, gate: Arc<dyn TokenGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<VenueResolver, LocusError> {
        let adapters = match self.providers {
            Some(adapters) => adapters,
            None => self
                .router
                .resolve(&self.config)
                .into_iter()
                .filter_map(|provider| self.config.providers.get(&provider).map(|s| (provider, s)))
                .map(|(provider, settings)| build_provider(provider, settings))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let available: Vec<Provider> = adapters.iter().map(|a| a.provider()).collect();
        if let Some(dup) = available
            .iter()
            .enumerate()
            .find_map(|(i, p)| available[..i].contains(p).then_some(*p))
        {
            return Err(LocusError::Config(format!(
                "more than one adapter registered for provider '{dup}'"
            )));
        }
        let preference = self.router.rank(&available);

        let retry = Arc::new(
            self.retry
                .unwrap_or_else(|| RetryPolicy::from_settings(&self.config.retry)),
        );
        let mut providers: Vec<GuardedProvider> = adapters
            .into_iter()
            .map(|adapter| GuardedProvider::from_config(adapter, Arc::clone(&retry), &self.config))
            .collect();
        providers.sort_by_key(|guarded| {
            preference
                .iter()
                .position(|p| *p == guarded.provider())
                .unwrap_or(usize::MAX)
        });

        let gate = self
            .gate
            .unwrap_or_else(|| -> Arc<dyn TokenGate> {
                Arc::new(RateLimiter::from_config(&self.config))
            });

        info!(
            providers = ?preference,
            cache_ttl_secs = self.config.cache_ttl_secs,
            "Venue resolver ready"
        );

        Ok(VenueResolver {
            inner: Arc::new(Inner {
                providers,
                preference,
                gate,
                cache: ResultCache::from_config(&self.config),
                coalescer: RequestCoalescer::new(),
            }),
        })
    }
}

impl VenueResolver {
    pub fn builder(config: EngineConfig) -> VenueResolverBuilder {
        let router = ProviderRouter::new(config.provider_order.clone());
        VenueResolverBuilder {
            config,
            router,
            providers: None,
            gate: None,
            retry: None,
        }
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, LocusError> {
        Self::builder(config).build()
    }

    /// Providers taking part in resolutions, most preferred first.
    pub fn providers(&self) -> &[Provider] {
        &self.inner.preference
    }

    /// Classifies the venue nearest to `point`.
    ///
    /// Returns `None` when no provider produced a usable answer. Concurrent
    /// calls inside one grid cell share a single upstream resolution.
    pub async fn classify(&self, point: GeoPoint) -> Option<VenueClassification> {
        if !point.is_valid() {
            warn!(lat = point.lat, lng = point.lng, "Ignoring invalid coordinate");
            return None;
        }

        let key = cache_key(point);
        let span = info_span!("classify", grid_key = %key);

        async {
            if let Some(venue) = self.inner.cache.get(&key).await {
                debug!("cache hit");
                return Some(venue);
            }

            let inner = Arc::clone(&self.inner);
            let work_key = key.clone();
            let work_span = Span::current();
            self.inner
                .coalescer
                .resolve(&key, move || {
                    async move { inner.resolve_and_store(work_key, point).await }
                        .instrument(work_span)
                })
                .await
        }
        .instrument(span)
        .await
    }
}

impl Inner {
    async fn resolve_and_store(
        &self,
        key: CacheKey,
        point: GeoPoint,
    ) -> Option<VenueClassification> {
        // a resolution for this cell may have finished while we queued
        if let Some(venue) = self.cache.get(&key).await {
            return Some(venue);
        }

        let hits = self.gather(point).await;
        let venue = fuse(&hits, &self.preference);

        match &venue {
            Some(venue) => {
                set_venue_attributes(&Span::current(), venue);
                debug!(
                    venue_type = ?venue.venue_type,
                    energy = venue.energy,
                    provider = %venue.provider,
                    "resolved"
                );
                self.cache.put(key, venue.clone()).await;
            }
            None => debug!(providers = self.providers.len(), "no provider answered"),
        }
        venue
    }

    async fn gather(&self, point: GeoPoint) -> Vec<ProviderHit> {
        let calls = self.providers.iter().map(|guarded| async move {
            let provider = guarded.provider();
            (provider, guarded.query_gated(self.gate.as_ref(), point).await)
        });

        join_all(calls)
            .await
            .into_iter()
            .filter_map(|(provider, outcome)| {
                debug!(%provider, outcome = outcome.label(), "provider outcome");
                outcome.into_hit().map(|mut hit| {
                    hit.provider = provider;
                    hit
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use locus_core::{MockPlaceProvider, ProviderError, VenueType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    /// Answers every call the same way after an optional delay.
    struct StubProvider {
        kind: Provider,
        answer: Result<Option<ProviderHit>, ProviderError>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn new(kind: Provider, answer: Result<Option<ProviderHit>, ProviderError>) -> Self {
            Self {
                kind,
                answer,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl PlaceProvider for StubProvider {
        fn provider(&self) -> Provider {
            self.kind
        }

        async fn nearest(&self, _point: GeoPoint) -> Result<Option<ProviderHit>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            self.answer.clone()
        }
    }

    fn hit(provider: Provider, name: &str, categories: &[&str], distance_m: Option<f64>) -> ProviderHit {
        ProviderHit {
            name: Some(name.to_string()),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            distance_m,
            provider,
        }
    }

    fn nyc() -> GeoPoint {
        GeoPoint::new(40.7128, -74.0060).unwrap()
    }

    fn resolver(providers: Vec<Arc<dyn PlaceProvider>>) -> VenueResolver {
        VenueResolver::builder(EngineConfig::default())
            .providers(providers)
            .retry_policy(RetryPolicy::default().with_seed(11))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_joes_bar_with_google_timing_out() {
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "Joe's Bar", &["bar"], None))),
        );
        let google = StubProvider::new(Provider::Google, Ok(None)).with_delay(Duration::from_secs(60));
        let resolver = resolver(vec![Arc::new(foursquare), Arc::new(google)]);

        let start = Instant::now();
        let venue = resolver.classify(nyc()).await.unwrap();

        assert_eq!(venue.venue_type, VenueType::Bar);
        assert_eq!(venue.energy, 0.7);
        assert_eq!(venue.name.as_deref(), Some("Joe's Bar"));
        assert_eq!(venue.provider, Provider::Foursquare);
        assert!(start.elapsed() <= Duration::from_millis(4_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_in_one_cell_hit_upstream_once() {
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "Bean There", &["coffee shop"], Some(8.0)))),
        )
        .with_delay(Duration::from_millis(200));
        let google = StubProvider::new(
            Provider::Google,
            Ok(Some(hit(Provider::Google, "Bean There", &["cafe"], Some(9.0)))),
        )
        .with_delay(Duration::from_millis(300));
        let foursquare_calls = foursquare.calls();
        let google_calls = google.calls();
        let resolver = resolver(vec![Arc::new(foursquare), Arc::new(google)]);

        let callers = (0..25).map(|_| {
            let resolver = resolver.clone();
            async move { resolver.classify(nyc()).await }
        });
        let results = join_all(callers).await;

        assert_eq!(foursquare_calls.load(Ordering::SeqCst), 1);
        assert_eq!(google_calls.load(Ordering::SeqCst), 1);
        let first = results[0].clone().unwrap();
        assert_eq!(first.venue_type, VenueType::Coffee);
        assert_eq!(first.distance_m, Some(8.0));
        assert!(results.iter().all(|r| r.as_ref() == Some(&first)));
    }

    #[tokio::test]
    async fn test_result_is_served_from_cache() {
        let google = StubProvider::new(
            Provider::Google,
            Ok(Some(hit(Provider::Google, "Iron Works", &["gym"], None))),
        );
        let calls = google.calls();
        let resolver = resolver(vec![Arc::new(google)]);

        let first = resolver.classify(nyc()).await;
        // same grid cell, a few meters away
        let second = resolver.classify(GeoPoint::new(40.71281, -74.00601).unwrap()).await;

        assert_eq!(first, second);
        assert_eq!(first.unwrap().venue_type, VenueType::Gym);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_cached() {
        let foursquare = StubProvider::new(Provider::Foursquare, Ok(None));
        let calls = foursquare.calls();
        let resolver = resolver(vec![Arc::new(foursquare)]);

        assert_eq!(resolver.classify(nyc()).await, None);
        assert_eq!(resolver.classify(nyc()).await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_providers_failing_degrades_to_none() {
        let foursquare = StubProvider::new(Provider::Foursquare, Err(ProviderError::Status(503)));
        let google =
            StubProvider::new(Provider::Google, Err(ProviderError::Transport("refused".into())));
        let foursquare_calls = foursquare.calls();
        let resolver = resolver(vec![Arc::new(foursquare), Arc::new(google)]);

        assert_eq!(resolver.classify(nyc()).await, None);
        assert_eq!(foursquare_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_providers_yields_none() {
        let resolver = VenueResolver::from_config(EngineConfig::default()).unwrap();
        assert!(resolver.providers().is_empty());
        assert_eq!(resolver.classify(nyc()).await, None);
    }

    #[tokio::test]
    async fn test_invalid_point_is_rejected_without_upstream_calls() {
        let mut mock = MockPlaceProvider::new();
        mock.expect_provider().return_const(Provider::Foursquare);
        mock.expect_nearest().never();
        let resolver = resolver(vec![Arc::new(mock)]);

        let point = GeoPoint {
            lat: 123.0,
            lng: 0.0,
        };
        assert_eq!(resolver.classify(point).await, None);
    }

    #[tokio::test]
    async fn test_throttled_provider_is_skipped() {
        let mut google = MockPlaceProvider::new();
        google.expect_provider().return_const(Provider::Google);
        google.expect_nearest().never();
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "Pocket Park", &["park"], Some(30.0)))),
        );

        let gate = RateLimiter::new().with_quota(Provider::Google, 0);
        let resolver = VenueResolver::builder(EngineConfig::default())
            .providers(vec![Arc::new(google), Arc::new(foursquare)])
            .rate_gate(Arc::new(gate))
            .build()
            .unwrap();

        let venue = resolver.classify(nyc()).await.unwrap();
        assert_eq!(venue.venue_type, VenueType::Park);
        assert_eq!(venue.provider, Provider::Foursquare);
    }

    #[tokio::test]
    async fn test_local_quota_limits_upstream_calls() {
        let foursquare = StubProvider::new(Provider::Foursquare, Ok(None));
        let calls = foursquare.calls();
        let resolver = VenueResolver::builder(EngineConfig::default())
            .providers(vec![Arc::new(foursquare)])
            .rate_gate(Arc::new(RateLimiter::new().with_quota(Provider::Foursquare, 2)))
            .build()
            .unwrap();

        for _ in 0..5 {
            resolver.classify(nyc()).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_equal_results_follow_provider_order() {
        let google = StubProvider::new(
            Provider::Google,
            Ok(Some(hit(Provider::Google, "G Lounge", &["lounge"], None))),
        );
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "F Lounge", &["lounge"], None))),
        );
        let mut config = EngineConfig::default();
        config.provider_order = vec![Provider::Google, Provider::Foursquare];

        let resolver = VenueResolver::builder(config)
            .providers(vec![Arc::new(foursquare), Arc::new(google)])
            .build()
            .unwrap();

        assert_eq!(resolver.providers(), &[Provider::Google, Provider::Foursquare]);
        let venue = resolver.classify(nyc()).await.unwrap();
        assert_eq!(venue.name.as_deref(), Some("G Lounge"));
    }

    #[test]
    fn test_duplicate_adapters_are_rejected() {
        let first = StubProvider::new(Provider::Foursquare, Ok(None));
        let second = StubProvider::new(Provider::Foursquare, Ok(None));

        let result = VenueResolver::builder(EngineConfig::default())
            .providers(vec![Arc::new(first), Arc::new(second)])
            .build();

        match result {
            Err(LocusError::Config(msg)) => assert!(msg.contains("foursquare"), "{msg}"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("duplicate adapters were accepted"),
        }
    }

    struct StalledGate;

    #[async_trait]
    impl TokenGate for StalledGate {
        async fn try_acquire(&self, _provider: Provider) -> bool {
            sleep(Duration::from_secs(30)).await;
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_rate_gate_stays_within_latency_ceiling() {
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "Joe's Bar", &["bar"], None))),
        );
        let calls = foursquare.calls();
        let resolver = VenueResolver::builder(EngineConfig::default())
            .providers(vec![Arc::new(foursquare)])
            .rate_gate(Arc::new(StalledGate))
            .build()
            .unwrap();

        let start = Instant::now();
        assert_eq!(resolver.classify(nyc()).await, None);
        assert!(start.elapsed() <= Duration::from_millis(4_500));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hit_provider_is_attributed_to_its_adapter() {
        let google = StubProvider::new(
            Provider::Google,
            Ok(Some(hit(Provider::Foursquare, "Mislabeled", &["office"], None))),
        );
        let resolver = resolver(vec![Arc::new(google)]);

        let venue = resolver.classify(nyc()).await.unwrap();
        assert_eq!(venue.provider, Provider::Google);
    }

    #[tokio::test]
    async fn test_abandoned_classification_can_be_retried() {
        let foursquare = StubProvider::new(
            Provider::Foursquare,
            Ok(Some(hit(Provider::Foursquare, "Late Night", &["nightclub"], None))),
        )
        .with_delay(Duration::from_millis(200));
        let calls = foursquare.calls();
        let resolver = resolver(vec![Arc::new(foursquare)]);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), resolver.classify(nyc())).await;
        assert!(abandoned.is_err());

        let venue = resolver.classify(nyc()).await.unwrap();
        assert_eq!(venue.venue_type, VenueType::Nightclub);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
