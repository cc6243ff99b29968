//! Outward spiral tile enumeration.
//!
//! Tiles are discovered from the center outward so that the middle of the
//! screen loads first. Each ring is found in two phases:
//!
//! 1. Four corner cursors (NE, SE, SW, NW) take one diagonal step. A cursor
//!    whose diagonal would leave the grid on one axis moves along the other
//!    axis only; a cursor blocked on both axes stays put.
//! 2. Four edge cursors start at the corners and walk S, W, N and E,
//!    emitting tiles until the next cell is off the grid, is one of this
//!    ring's corners, or belongs to an inner ring.
//!
//! ```text
//!   NW ──E──► ┐ NE
//!   ▲         │
//!   N    C    S
//!   │         ▼
//!   SW ◄──W── SE
//! ```
//!
//! Every step is made in Mercator space from the cursor's geographic
//! position, so each tile center carries the projection's distortion rather
//! than an integer-grid approximation.
//!
//! The emission order is part of the contract: center, then per ring the
//! four corners followed by the four edges.

use tracing::{debug, warn};

use super::types::{GridRequest, GridTile, TileXy};
use super::GridLayout;
use crate::coord::{latlng_to_xy, xy_per_pixel_unit, xy_to_latlng, LatLng};

/// Number of corner cursors; all failing ends the walk.
const CORNER_COUNT: usize = 4;

/// Grid directions, screen oriented (north is up, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Heading {
    fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::NorthEast => (1, -1),
            Heading::SouthEast => (1, 1),
            Heading::SouthWest => (-1, 1),
            Heading::NorthWest => (-1, -1),
        }
    }
}

/// Corner diagonals paired with the edge each corner walks afterwards.
const CORNER_WALKS: [(Heading, Heading); CORNER_COUNT] = [
    (Heading::NorthEast, Heading::South),
    (Heading::SouthEast, Heading::West),
    (Heading::SouthWest, Heading::North),
    (Heading::NorthWest, Heading::East),
];

#[derive(Debug, Clone, Copy)]
struct Cursor {
    xy: TileXy,
    position: LatLng,
}

struct SpiralWalker<'a> {
    request: &'a GridRequest,
    layout: GridLayout,
    unit_x: f64,
    unit_y: f64,
    tiles: Vec<GridTile>,
}

impl<'a> SpiralWalker<'a> {
    fn new(request: &'a GridRequest, layout: GridLayout) -> Self {
        let capacity = layout.tile_count();
        Self {
            request,
            layout,
            unit_x: xy_per_pixel_unit(request.tile_size.width as f64),
            unit_y: xy_per_pixel_unit(request.tile_size.height as f64),
            tiles: Vec::with_capacity(capacity),
        }
    }

    fn emit(&mut self, cursor: &Cursor) {
        self.tiles.push(GridTile {
            lat_lng: cursor.position,
            tile_xy: cursor.xy,
            tile_pixel_size: self.request.tile_size,
            zoom_level: self.request.zoom_level,
        });
    }

    /// Moves a cursor by whole tiles through Mercator space.
    fn step(&self, cursor: &Cursor, dx: i32, dy: i32) -> Cursor {
        let zoom = self.layout.zoom;
        let moved = latlng_to_xy(cursor.position, zoom)
            .offset(dx as f64 * self.unit_x, dy as f64 * self.unit_y);

        Cursor {
            xy: cursor.xy.offset(dx, dy),
            position: xy_to_latlng(moved, zoom),
        }
    }

    /// Diagonal step clamped to the grid; `None` when blocked on both axes.
    fn advance_corner(&self, corner: &Cursor, heading: Heading) -> Option<Cursor> {
        let (dx, dy) = heading.delta();
        let x_fits = self.layout.contains_x(corner.xy.x + dx);
        let y_fits = self.layout.contains_y(corner.xy.y + dy);

        match (x_fits, y_fits) {
            (true, true) => Some(self.step(corner, dx, dy)),
            (true, false) => Some(self.step(corner, dx, 0)),
            (false, true) => Some(self.step(corner, 0, dy)),
            (false, false) => None,
        }
    }

    fn walk_edge(&mut self, start: &Cursor, heading: Heading, ring: i32, corners: &[TileXy]) {
        let (dx, dy) = heading.delta();
        let mut cursor = *start;

        loop {
            let next = cursor.xy.offset(dx, dy);
            if !self.layout.contains(next)
                || corners.contains(&next)
                || self.layout.ring_of(next) < ring
            {
                break;
            }
            cursor = self.step(&cursor, dx, dy);
            self.emit(&cursor);
        }
    }

    fn run(mut self) -> Vec<GridTile> {
        let center = Cursor {
            xy: self.layout.center_xy,
            position: self.request.center,
        };
        self.emit(&center);

        let mut corners = [center; CORNER_COUNT];
        let max_ring = self.layout.max_ring();
        let mut ring = 0;

        loop {
            ring += 1;
            if ring > max_ring + 1 {
                warn!(ring, max_ring, "Spiral exceeded ring bound, stopping");
                break;
            }

            let mut end_corner_loop = 0;
            let mut advanced = [false; CORNER_COUNT];

            for (i, (diagonal, _)) in CORNER_WALKS.iter().enumerate() {
                match self.advance_corner(&corners[i], *diagonal) {
                    Some(next) => {
                        corners[i] = next;
                        advanced[i] = true;
                        self.emit(&next);
                    }
                    None => end_corner_loop += 1,
                }
            }

            if end_corner_loop == CORNER_COUNT {
                break;
            }

            let corner_xys: Vec<TileXy> = corners.iter().map(|c| c.xy).collect();
            for (i, (_, edge)) in CORNER_WALKS.iter().enumerate() {
                if advanced[i] {
                    let start = corners[i];
                    self.walk_edge(&start, *edge, ring, &corner_xys);
                }
            }
        }

        self.tiles
    }
}

/// Computes the ordered tiles covering a viewport plus a one-tile border.
///
/// Never fails: fractional zoom and a non-zero window offset are logged as
/// unsupported and the walk continues with the floored zoom and no offset.
/// The result always holds exactly `tile_count_width * tile_count_height`
/// distinct tiles.
pub fn get_tiles_for_grid(request: &GridRequest) -> Vec<GridTile> {
    if request.zoom_level.fract() != 0.0 {
        warn!(
            zoom_level = request.zoom_level,
            "Fractional zoom is not implemented, using floor"
        );
    }
    if !request.window_offset.is_origin() {
        warn!(
            offset_x = request.window_offset.x,
            offset_y = request.window_offset.y,
            "Window offset is not implemented, ignoring"
        );
    }

    let layout = GridLayout::for_request(request);
    let tiles = SpiralWalker::new(request, layout).run();

    debug!(
        tiles = tiles.len(),
        width = layout.tile_count_width,
        height = layout.tile_count_height,
        zoom = layout.zoom,
        "Computed tile grid"
    );

    tiles
}
