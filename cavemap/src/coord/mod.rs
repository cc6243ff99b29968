//! Coordinate projection module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and the Web Mercator "tile unit" space used by satellite imagery
//! providers, plus a great-circle helper for distance scales.
//!
//! All functions are pure. Poles are outside the projection domain: inputs
//! at exactly ±90° produce non-finite results and are not special-cased.

mod scale;
mod types;

pub use scale::ScaleCache;
pub use types::{LatLng, MercatorXy, EARTH_MEAN_RADIUS_M, MAX_LAT, MIN_LAT, WORLD_TILE_SIZE};

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Converts geographic coordinates to Mercator tile units.
///
/// # Arguments
///
/// * `position` - Latitude/longitude in degrees
/// * `zoom` - Integer zoom level
///
/// # Returns
///
/// The position in tile units, where the world spans `2^zoom` units.
#[inline]
pub fn latlng_to_xy(position: LatLng, zoom: u8) -> MercatorXy {
    let n = world_units(zoom);
    let lat_rad = position.lat.to_radians();

    let x = n * (position.lng + 180.0) / 360.0;
    let y = n * (PI - (FRAC_PI_4 + lat_rad / 2.0).tan().ln()) / (2.0 * PI);

    MercatorXy { x, y }
}

/// Converts Mercator tile units back to geographic coordinates.
///
/// Exact inverse of [`latlng_to_xy`] within floating-point precision.
#[inline]
pub fn xy_to_latlng(xy: MercatorXy, zoom: u8) -> LatLng {
    let n = world_units(zoom);

    let lat = (2.0 * (PI - 2.0 * PI * xy.y / n).exp().atan() - FRAC_PI_2).to_degrees();
    let lng = -180.0 + 360.0 * xy.x / n;

    LatLng { lat, lng }
}

/// Converts a pixel distance into Mercator tile units.
///
/// The reference world tile is 256 pixels, so a 512-pixel tile spans two
/// units and a 640-pixel tile spans 2.5.
#[inline]
pub fn xy_per_pixel_unit(pixels: f64) -> f64 {
    pixels / WORLD_TILE_SIZE
}

/// Computes the great-circle destination from a start point.
///
/// # Arguments
///
/// * `from` - Start position
/// * `distance_m` - Distance to travel in meters
/// * `heading_deg` - Initial bearing in degrees clockwise from north
pub fn destination_point(from: LatLng, distance_m: f64, heading_deg: f64) -> LatLng {
    let phi1 = from.lat.to_radians();
    let lambda1 = from.lng.to_radians();
    let theta = heading_deg.to_radians();
    let delta = distance_m / EARTH_MEAN_RADIUS_M;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    LatLng {
        lat: phi2.to_degrees(),
        lng: lambda2.to_degrees(),
    }
}

/// Wraps a longitude into `[-180, 180)`.
#[inline]
pub fn normalize_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[inline]
fn world_units(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}
