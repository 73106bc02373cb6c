//! Google Places (new API) adapter
//!
//! Uses `places:searchNearby` ranked by distance. The API does not report a
//! distance, so one is computed from the returned location.

use async_trait::async_trait;
use locus_core::grid::haversine_m;
use locus_core::{
    GeoPoint, LocusError, PlaceProvider, Provider, ProviderError, ProviderHit, ProviderSettings,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, check_status, endpoint, normalize_categories, transport};

pub const DEFAULT_BASE_URL: &str = "https://places.googleapis.com";
const SEARCH_RADIUS_M: f64 = 80.0;
const FIELD_MASK: &str = "places.displayName,places.primaryType,places.types,places.location";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchNearbyRequest {
    max_result_count: u8,
    rank_preference: &'static str,
    location_restriction: LocationRestriction,
}

#[derive(Debug, Serialize)]
struct LocationRestriction {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchNearbyResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    display_name: Option<LocalizedText>,
    primary_type: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

pub struct GoogleProvider {
    http: Client,
    search_url: Url,
    api_key: String,
}

impl GoogleProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LocusError> {
        let base = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Ok(Self {
            http: build_client()?,
            search_url: endpoint(base, "/v1/places:searchNearby")?,
            api_key: settings.api_key.clone(),
        })
    }
}

fn request_body(point: GeoPoint) -> SearchNearbyRequest {
    SearchNearbyRequest {
        max_result_count: 1,
        rank_preference: "DISTANCE",
        location_restriction: LocationRestriction {
            circle: Circle {
                center: LatLng {
                    latitude: point.lat,
                    longitude: point.lng,
                },
                radius: SEARCH_RADIUS_M,
            },
        },
    }
}

fn into_hit(place: Place, origin: GeoPoint) -> ProviderHit {
    let labels = place
        .primary_type
        .into_iter()
        .chain(place.types)
        .map(|label| label.replace('_', " "));
    let distance_m = place.location.map(|location| {
        haversine_m(
            origin,
            GeoPoint {
                lat: location.latitude,
                lng: location.longitude,
            },
        )
    });

    ProviderHit {
        name: place.display_name.and_then(|text| text.text),
        categories: normalize_categories(labels),
        distance_m,
        provider: Provider::Google,
    }
}

#[async_trait]
impl PlaceProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn nearest(&self, point: GeoPoint) -> Result<Option<ProviderHit>, ProviderError> {
        let response = self
            .http
            .post(self.search_url.clone())
            .header("X-Goog-Api-Key", self.api_key.as_str())
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request_body(point))
            .send()
            .await
            .map_err(transport)?;
        let body: SearchNearbyResponse = check_status(response)?.json().await.map_err(transport)?;

        match body.places.into_iter().next() {
            Some(place) => Ok(Some(into_hit(place, point))),
            None => {
                debug!(lat = point.lat, lng = point.lng, "google returned no places");
                Ok(None)
            }
        }
    }
}
