//! Coordinate value types and projection constants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference world-tile edge in pixels (Google/Bing Web Mercator tiles).
pub const WORLD_TILE_SIZE: f64 = 256.0;

/// Earth mean radius in meters (IUGG).
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new position.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns a copy with the longitude wrapped into `[-180, 180)`.
    pub fn normalized(self) -> Self {
        Self {
            lat: self.lat,
            lng: super::normalize_lng(self.lng),
        }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Position in Web Mercator tile units at a given zoom.
///
/// One unit equals one 256-pixel world tile; the world spans `2^zoom`
/// units on each axis. `x` grows eastward, `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MercatorXy {
    pub x: f64,
    pub y: f64,
}

impl MercatorXy {
    /// Creates a new Mercator position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by `(dx, dy)` tile units.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Euclidean distance to another position, in tile units.
    pub fn distance_to(self, other: MercatorXy) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
