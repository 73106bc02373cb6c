//! Spatial quantization of coordinates into cache keys

use crate::types::{CacheKey, GeoPoint};

/// Latitude step of one cell, roughly 245 m.
pub const CELL_DEGREES: f64 = 0.0022;

/// Lower bound on the longitude scale so polar cells stay finite.
const MIN_LNG_SCALE: f64 = 0.2;

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Grid cell indices of a point.
///
/// Every point of one latitude row uses the cosine of the row's centre, so the
/// longitude step is constant along the row.
pub fn cell_of(point: GeoPoint) -> (i64, i64) {
    let lat_index = (point.lat / CELL_DEGREES).floor();
    let lng_step = lng_step_for_row(lat_index);
    let lng_index = (point.lng / lng_step).floor();
    (lat_index as i64, lng_index as i64)
}

/// South-west and north-east corners of a cell.
pub fn cell_bounds(lat_index: i64, lng_index: i64) -> (GeoPoint, GeoPoint) {
    let lng_step = lng_step_for_row(lat_index as f64);
    let south_west = GeoPoint {
        lat: lat_index as f64 * CELL_DEGREES,
        lng: lng_index as f64 * lng_step,
    };
    let north_east = GeoPoint {
        lat: (lat_index + 1) as f64 * CELL_DEGREES,
        lng: (lng_index + 1) as f64 * lng_step,
    };
    (south_west, north_east)
}

fn lng_step_for_row(lat_index: f64) -> f64 {
    let row_center = (lat_index + 0.5) * CELL_DEGREES;
    let scale = row_center.to_radians().cos().max(MIN_LNG_SCALE);
    CELL_DEGREES / scale
}

pub fn cache_key(point: GeoPoint) -> CacheKey {
    let (lat_index, lng_index) = cell_of(point);
    CacheKey::new(format!("{}:{}", lat_index, lng_index))
}

/// Great-circle distance in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
