//! Shared data types for Locus
//!
//! Defines the coordinate, provider and classification structures used across
//! the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LocusError;

/// A WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, LocusError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(LocusError::InvalidCoordinate { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Spatial cache key of one grid cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An upstream place-data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Foursquare,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Foursquare, Provider::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Foursquare => "foursquare",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "foursquare" => Ok(Provider::Foursquare),
            "google" => Ok(Provider::Google),
            unknown => Err(LocusError::UnknownProvider(unknown.to_string())),
        }
    }
}

/// The nearest candidate one provider reported, normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHit {
    pub name: Option<String>,
    pub categories: Vec<String>,
    pub distance_m: Option<f64>,
    pub provider: Provider,
}

/// What became of one provider during a resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Hit(ProviderHit),
    /// The provider answered but had nothing near the point.
    NoMatch,
    /// The local rate gate denied the call.
    Throttled,
    /// Upstream kept answering 429.
    RateLimited,
    TimedOut,
    Unavailable(String),
}

impl ProviderOutcome {
    pub fn into_hit(self) -> Option<ProviderHit> {
        match self {
            ProviderOutcome::Hit(hit) => Some(hit),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderOutcome::Hit(_) => "hit",
            ProviderOutcome::NoMatch => "no_match",
            ProviderOutcome::Throttled => "throttled",
            ProviderOutcome::RateLimited => "rate_limited",
            ProviderOutcome::TimedOut => "timed_out",
            ProviderOutcome::Unavailable(_) => "unavailable",
        }
    }
}

/// Coarse kind of venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueType {
    Nightclub,
    Bar,
    Coffee,
    Gym,
    Park,
    Office,
    Restaurant,
    General,
}

impl VenueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueType::Nightclub => "nightclub",
            VenueType::Bar => "bar",
            VenueType::Coffee => "coffee",
            VenueType::Gym => "gym",
            VenueType::Park => "park",
            VenueType::Office => "office",
            VenueType::Restaurant => "restaurant",
            VenueType::General => "general",
        }
    }
}

/// The public result of a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueClassification {
    #[serde(rename = "type")]
    pub venue_type: VenueType,
    pub energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_new_valid() {
        let point = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert_eq!(point.lat, 40.7128);
        assert_eq!(point.lng, -74.0060);
    }

    #[test]
    fn test_geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("foursquare".parse::<Provider>().unwrap(), Provider::Foursquare);
        assert_eq!(" Google ".parse::<Provider>().unwrap(), Provider::Google);
        let err = "yelp".parse::<Provider>().unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_classification_wire_shape() {
        let venue = VenueClassification {
            venue_type: VenueType::Bar,
            energy: 0.7,
            name: Some("Joe's Bar".to_string()),
            provider: Provider::Foursquare,
            distance_m: Some(12.0),
        };
        let json = serde_json::to_value(&venue).unwrap();
        assert_eq!(json["type"], "bar");
        assert_eq!(json["energy"], 0.7);
        assert_eq!(json["name"], "Joe's Bar");
        assert_eq!(json["provider"], "foursquare");
        assert_eq!(json["distanceM"], 12.0);
    }

    #[test]
    fn test_classification_omits_missing_optionals() {
        let venue = VenueClassification {
            venue_type: VenueType::General,
            energy: 0.5,
            name: None,
            provider: Provider::Google,
            distance_m: None,
        };
        let json = serde_json::to_value(&venue).unwrap();
        assert!(json.get("name").is_none());
        assert!(json.get("distanceM").is_none());
    }

    #[test]
    fn test_outcome_into_hit() {
        let hit = ProviderHit {
            name: None,
            categories: vec!["park".into()],
            distance_m: None,
            provider: Provider::Google,
        };
        assert_eq!(ProviderOutcome::Hit(hit.clone()).into_hit(), Some(hit));
        assert_eq!(ProviderOutcome::TimedOut.into_hit(), None);
        assert_eq!(ProviderOutcome::Throttled.label(), "throttled");
    }

    #[test]
    fn test_venue_type_as_str_matches_wire_name() {
        let all = [
            VenueType::Nightclub,
            VenueType::Bar,
            VenueType::Coffee,
            VenueType::Gym,
            VenueType::Park,
            VenueType::Office,
            VenueType::Restaurant,
            VenueType::General,
        ];
        for venue_type in all {
            assert_eq!(serde_json::to_value(venue_type).unwrap(), venue_type.as_str());
        }
    }
}
