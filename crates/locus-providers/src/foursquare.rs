//! Foursquare Places v3 adapter

use async_trait::async_trait;
use locus_core::{
    GeoPoint, LocusError, PlaceProvider, Provider, ProviderError, ProviderHit, ProviderSettings,
};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::http::{build_client, check_status, endpoint, normalize_categories, transport};

pub const DEFAULT_BASE_URL: &str = "https://api.foursquare.com/v3";
const SEARCH_RADIUS_M: u32 = 80;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Category {
    name: Option<String>,
}

pub struct FoursquareProvider {
    http: Client,
    search_url: Url,
    api_key: String,
}

impl FoursquareProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LocusError> {
        let base = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Ok(Self {
            http: build_client()?,
            search_url: endpoint(base, "/places/search")?,
            api_key: settings.api_key.clone(),
        })
    }

    fn search_url(&self, point: GeoPoint) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("ll", &format!("{},{}", point.lat, point.lng))
            .append_pair("radius", &SEARCH_RADIUS_M.to_string())
            .append_pair("limit", "1")
            .append_pair("sort", "DISTANCE");
        url
    }
}

#[async_trait]
impl PlaceProvider for FoursquareProvider {
    fn provider(&self) -> Provider {
        Provider::Foursquare
    }

    async fn nearest(&self, point: GeoPoint) -> Result<Option<ProviderHit>, ProviderError> {
        let response = self
            .http
            .get(self.search_url(point))
            .header("Authorization", self.api_key.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport)?;
        let body: SearchResponse = check_status(response)?.json().await.map_err(transport)?;

        let Some(place) = body.results.into_iter().next() else {
            debug!(lat = point.lat, lng = point.lng, "foursquare returned no places");
            return Ok(None);
        };

        Ok(Some(ProviderHit {
            name: place.name,
            categories: normalize_categories(place.categories.into_iter().filter_map(|c| c.name)),
            distance_m: place.distance,
            provider: Provider::Foursquare,
        }))
    }
}
