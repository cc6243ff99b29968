//! Value types for the tile grid.

use serde::{Deserialize, Serialize};

use crate::coord::LatLng;

/// Width × height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    /// Creates a new pixel size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square size with equal edges.
    pub const fn square(edge: u32) -> Self {
        Self {
            width: edge,
            height: edge,
        }
    }
}

/// Sub-pixel screen offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    /// Creates a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both components are zero.
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Integer grid coordinate, 1-based from the top-left of the grid.
///
/// Signed because cursors probe one step past the grid edge while walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileXy {
    pub x: i32,
    pub y: i32,
}

impl TileXy {
    /// Creates a new grid coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate shifted by `(dx, dy)` cells.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// One renderable map tile.
///
/// Recomputed on every render pass; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridTile {
    /// Geographic center of the tile.
    pub lat_lng: LatLng,
    /// Position within the grid.
    pub tile_xy: TileXy,
    /// Tile image size in pixels.
    pub tile_pixel_size: PixelSize,
    /// Requested zoom; only the floor is used for projection.
    pub zoom_level: f64,
}

impl GridTile {
    /// Integer zoom used for projection and cache keys.
    pub fn zoom(&self) -> u8 {
        super::floor_zoom(self.zoom_level)
    }

    /// Top-left pixel of this tile within the rendered grid.
    ///
    /// Grid coordinates are 1-based; placement is 0-based.
    pub fn pixel_position(&self) -> (i64, i64) {
        let x = (self.tile_xy.x as i64 - 1) * self.tile_pixel_size.width as i64;
        let y = (self.tile_xy.y as i64 - 1) * self.tile_pixel_size.height as i64;
        (x, y)
    }
}

/// Input to a grid computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRequest {
    /// Geographic point shown at the center of the viewport.
    pub center: LatLng,
    /// Viewport size in pixels.
    pub viewport: PixelSize,
    /// Size of a single tile image in pixels.
    pub tile_size: PixelSize,
    /// Zoom level. Fractional zoom is not rendered; the floor is used.
    pub zoom_level: f64,
    /// Sub-tile panning offset. Not rendered yet; ignored with a warning.
    pub window_offset: PixelPoint,
}

impl GridRequest {
    /// Creates a request with no window offset.
    pub fn new(center: LatLng, viewport: PixelSize, tile_size: PixelSize, zoom_level: f64) -> Self {
        Self {
            center,
            viewport,
            tile_size,
            zoom_level,
            window_offset: PixelPoint::default(),
        }
    }

    /// Sets the window offset.
    pub fn with_window_offset(mut self, offset: PixelPoint) -> Self {
        self.window_offset = offset;
        self
    }
}

/// A tile together with everything a fetcher and renderer need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub tile: GridTile,
    /// Left edge in pixels, 0-based.
    pub x_pos: i64,
    /// Top edge in pixels, 0-based.
    pub y_pos: i64,
    /// Deterministic cache/content key.
    pub cache_key: String,
}
