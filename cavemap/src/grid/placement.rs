//! Pixel placement and cache keys for grid tiles.

use super::spiral::get_tiles_for_grid;
use super::types::{GridRequest, TilePlacement};
use crate::coord::LatLng;

/// Builds the cache key for a tile image.
///
/// Format: `<provider>_zoom-<zoom>_lat-<lat>_lng-<lng>`. Floats use Rust's
/// shortest round-trip formatting, so identical inputs always produce the
/// same key.
pub fn cache_key(provider: &str, zoom: u8, lat_lng: LatLng) -> String {
    format!(
        "{}_zoom-{}_lat-{}_lng-{}",
        provider, zoom, lat_lng.lat, lat_lng.lng
    )
}

/// Computes the spiral tile list with pixel placement and cache keys.
pub fn plan_tiles(request: &GridRequest, provider: &str) -> Vec<TilePlacement> {
    get_tiles_for_grid(request)
        .into_iter()
        .map(|tile| {
            let (x_pos, y_pos) = tile.pixel_position();
            TilePlacement {
                cache_key: cache_key(provider, tile.zoom(), tile.lat_lng),
                x_pos,
                y_pos,
                tile,
            }
        })
        .collect()
}
