//! Tile grid engine
//!
//! Given a geographic center, a viewport, a tile size and a zoom level,
//! computes which map tiles cover the screen (plus a one-tile scroll border
//! on every side), where each one is drawn, and the key it is cached under.
//!
//! The computation is synchronous and pure; it finishes before any tile is
//! dispatched for fetching.
//!
//! # Example
//!
//! ```
//! use cavemap::coord::LatLng;
//! use cavemap::grid::{plan_tiles, GridRequest, PixelSize};
//!
//! let request = GridRequest::new(
//!     LatLng::new(44.12, 4.08),
//!     PixelSize::square(256),
//!     PixelSize::square(256),
//!     15.0,
//! );
//! let plan = plan_tiles(&request, "google");
//! assert_eq!(plan.len(), 25);
//! assert_eq!((plan[0].x_pos, plan[0].y_pos), (512, 512));
//! ```

mod placement;
mod spiral;
mod types;

pub use placement::{cache_key, plan_tiles};
pub use spiral::get_tiles_for_grid;
pub use types::{GridRequest, GridTile, PixelPoint, PixelSize, TilePlacement, TileXy};

use tracing::warn;

/// Highest zoom the projector is driven at.
pub const MAX_GRID_ZOOM: u8 = 30;

/// Floors a zoom level into the supported integer range.
pub(crate) fn floor_zoom(zoom_level: f64) -> u8 {
    if !zoom_level.is_finite() || zoom_level < 0.0 {
        return 0;
    }
    zoom_level.floor().min(MAX_GRID_ZOOM as f64) as u8
}

/// Tile counts, center cell and integer zoom derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Columns, always odd.
    pub tile_count_width: u32,
    /// Rows, always odd.
    pub tile_count_height: u32,
    /// 1-based cell holding the requested center.
    pub center_xy: TileXy,
    /// Floored zoom used for projection.
    pub zoom: u8,
}

impl GridLayout {
    /// Derives the layout for a request.
    ///
    /// Counts are `ceil(viewport / tile) + 2`, bumped to the next odd number
    /// so that a single center cell exists.
    pub fn for_request(request: &GridRequest) -> Self {
        let tile_count_width = odd_tile_count(request.viewport.width, request.tile_size.width);
        let tile_count_height = odd_tile_count(request.viewport.height, request.tile_size.height);

        Self {
            tile_count_width,
            tile_count_height,
            center_xy: TileXy::new(
                tile_count_width.div_ceil(2) as i32,
                tile_count_height.div_ceil(2) as i32,
            ),
            zoom: floor_zoom(request.zoom_level),
        }
    }

    /// Total number of tiles in the grid.
    pub fn tile_count(&self) -> usize {
        self.tile_count_width as usize * self.tile_count_height as usize
    }

    pub(crate) fn contains_x(&self, x: i32) -> bool {
        x >= 1 && x <= self.tile_count_width as i32
    }

    pub(crate) fn contains_y(&self, y: i32) -> bool {
        y >= 1 && y <= self.tile_count_height as i32
    }

    /// Returns true if the cell lies inside the grid.
    pub fn contains(&self, xy: TileXy) -> bool {
        self.contains_x(xy.x) && self.contains_y(xy.y)
    }

    /// Chebyshev distance of a cell from the center cell.
    pub fn ring_of(&self, xy: TileXy) -> i32 {
        (xy.x - self.center_xy.x)
            .abs()
            .max((xy.y - self.center_xy.y).abs())
    }

    /// Outermost ring that still holds tiles.
    pub fn max_ring(&self) -> i32 {
        let half_w = (self.tile_count_width as i32 - 1) / 2;
        let half_h = (self.tile_count_height as i32 - 1) / 2;
        half_w.max(half_h)
    }
}

fn odd_tile_count(viewport: u32, tile: u32) -> u32 {
    let tile = if tile == 0 {
        warn!("Zero tile dimension, treating as one pixel");
        1
    } else {
        tile
    };

    let count = viewport.div_ceil(tile) + 2;
    if count % 2 == 0 {
        count + 1
    } else {
        count
    }
}
