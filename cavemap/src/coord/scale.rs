//! Memoized distance scales.
//!
//! Answers "how many Mercator tile units make up one kilometre here" for map
//! scale bars and survey overlays. The cache is a plain value owned by the
//! caller; there is no process-wide state.

use std::collections::HashMap;

use super::{destination_point, latlng_to_xy, LatLng, WORLD_TILE_SIZE};

/// Latitude quantization for cache keys (micro-degrees).
const LAT_KEY_SCALE: f64 = 1_000_000.0;

/// Caller-owned memo of tile units per kilometre, keyed by zoom and latitude.
#[derive(Debug, Default, Clone)]
pub struct ScaleCache {
    entries: HashMap<(u8, i64), f64>,
}

impl ScaleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mercator tile units covered by 1 km heading east from `at`.
    pub fn xy_units_per_km(&mut self, at: LatLng, zoom: u8) -> f64 {
        let key = (zoom, (at.lat * LAT_KEY_SCALE).round() as i64);
        *self
            .entries
            .entry(key)
            .or_insert_with(|| compute_units_per_km(at, zoom))
    }

    /// Screen pixels covered by 1 km at the reference 256-pixel tile size.
    pub fn pixels_per_km(&mut self, at: LatLng, zoom: u8) -> f64 {
        self.xy_units_per_km(at, zoom) * WORLD_TILE_SIZE
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been memoized yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every memoized entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn compute_units_per_km(at: LatLng, zoom: u8) -> f64 {
    let east = destination_point(at, 1000.0, 90.0);
    latlng_to_xy(at, zoom).distance_to(latlng_to_xy(east, zoom))
}
