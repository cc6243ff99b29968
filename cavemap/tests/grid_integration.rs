//! Integration tests for grid planning and tile fetching.
//!
//! Run with: `cargo test --test grid_integration`

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use cavemap::cache::TileDiskCache;
use cavemap::coord::{latlng_to_xy, LatLng};
use cavemap::fetch::{FetchConfig, FetchSummary, TileFetcher};
use cavemap::grid::{get_tiles_for_grid, plan_tiles, GridLayout, GridRequest, PixelSize, TileXy};
use cavemap::provider::{GoogleStaticMapProvider, HttpClient, ProviderError};

// ============================================================================
// Helpers
// ============================================================================

/// Toulouse, a desktop-sized viewport at street zoom.
fn toulouse_request() -> GridRequest {
    GridRequest::new(
        LatLng::new(43.6045, 1.444),
        PixelSize::new(1024, 768),
        PixelSize::square(256),
        16.0,
    )
}

/// Serves the same small PNG for every URL.
struct StaticPngClient {
    body: Vec<u8>,
    hits: AtomicUsize,
}

impl StaticPngClient {
    fn new() -> Self {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        let mut body = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut body), image::ImageFormat::Png)
            .unwrap();
        Self {
            body,
            hits: AtomicUsize::new(0),
        }
    }
}

impl HttpClient for StaticPngClient {
    fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

// ============================================================================
// Grid
// ============================================================================

#[test]
fn test_desktop_viewport_layout() {
    let layout = GridLayout::for_request(&toulouse_request());

    // ceil(1024/256)+2 = 6 -> 7, ceil(768/256)+2 = 5
    assert_eq!(layout.tile_count_width, 7);
    assert_eq!(layout.tile_count_height, 5);
    assert_eq!(layout.tile_count(), 35);
}

#[test]
fn test_spiral_covers_grid_exactly_once() {
    let tiles = get_tiles_for_grid(&toulouse_request());
    assert_eq!(tiles.len(), 35);

    let seen: HashSet<TileXy> = tiles.iter().map(|t| t.tile_xy).collect();
    assert_eq!(seen.len(), 35);
    for x in 1..=7 {
        for y in 1..=5 {
            assert!(seen.contains(&TileXy::new(x, y)), "missing ({x}, {y})");
        }
    }
}

#[test]
fn test_center_tile_first_at_requested_position() {
    let request = toulouse_request();
    let plan = plan_tiles(&request, "google");

    let center = &plan[0];
    assert_eq!(center.tile.tile_xy, TileXy::new(4, 3));
    assert_eq!(center.tile.lat_lng, request.center);
    assert_eq!((center.x_pos, center.y_pos), (768, 512));
}

#[test]
fn test_neighbors_are_one_tile_apart_in_mercator_space() {
    let tiles = get_tiles_for_grid(&toulouse_request());
    let center = tiles[0];
    let east = tiles
        .iter()
        .find(|t| t.tile_xy == TileXy::new(5, 3))
        .unwrap();
    let south = tiles
        .iter()
        .find(|t| t.tile_xy == TileXy::new(4, 4))
        .unwrap();

    let c = latlng_to_xy(center.lat_lng, 16);
    let e = latlng_to_xy(east.lat_lng, 16);
    let s = latlng_to_xy(south.lat_lng, 16);

    assert!((e.x - c.x - 1.0).abs() < 1e-6);
    assert!((e.y - c.y).abs() < 1e-6);
    assert!((s.y - c.y - 1.0).abs() < 1e-6);
    assert!(south.lat_lng.lat < center.lat_lng.lat);
}

#[test]
fn test_cache_keys_unique_per_tile() {
    let plan = plan_tiles(&toulouse_request(), "google");
    let keys: HashSet<&str> = plan.iter().map(|p| p.cache_key.as_str()).collect();
    assert_eq!(keys.len(), plan.len());
    assert!(plan.iter().all(|p| p.cache_key.starts_with("google_zoom-16_")));
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_plan_fetch_and_reuse_cache() {
    let temp = TempDir::new().unwrap();
    let cache = TileDiskCache::new(temp.path().join("tiles"));
    let http = Arc::new(StaticPngClient::new());

    let fetcher = TileFetcher::new(
        Arc::new(GoogleStaticMapProvider::new("integration")),
        http.clone(),
        Some(cache.clone()),
        FetchConfig::default().with_workers(4),
    )
    .unwrap();

    let plan = plan_tiles(&toulouse_request(), fetcher.provider_name());

    let first = fetcher.fetch_all(plan.clone(), CancellationToken::new()).await;
    assert_eq!(FetchSummary::from_outcomes(&first).from_network, 35);
    assert_eq!(cache.stats().unwrap().files, 35);

    let second = fetcher.fetch_all(plan, CancellationToken::new()).await;
    assert_eq!(FetchSummary::from_outcomes(&second).from_cache, 35);
    assert_eq!(http.hits.load(Ordering::SeqCst), 35);
}
