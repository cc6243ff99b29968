//! Grid command - print the tile plan for a viewport.

use cavemap::grid::{plan_tiles, GridLayout};

use super::common::{load_config, GridArgs};
use crate::error::CliError;

/// Run the grid command.
pub fn run(args: GridArgs) -> Result<(), CliError> {
    let config = load_config();
    let request = args.to_request(&config)?;
    let layout = GridLayout::for_request(&request);
    let plan = plan_tiles(&request, &config.provider.name);

    println!(
        "Grid {}x{} tiles at zoom {} (center cell {},{})",
        layout.tile_count_width,
        layout.tile_count_height,
        layout.zoom,
        layout.center_xy.x,
        layout.center_xy.y
    );
    println!();
    println!(
        "{:>4}  {:>7}  {:>12} {:>12}  {:>11}  key",
        "#", "cell", "lat", "lng", "pixel"
    );

    for (index, placement) in plan.iter().enumerate() {
        let tile = &placement.tile;
        println!(
            "{:>4}  {:>3},{:<3}  {:>12.7} {:>12.7}  {:>5},{:<5}  {}",
            index,
            tile.tile_xy.x,
            tile.tile_xy.y,
            tile.lat_lng.lat,
            tile.lat_lng.lng,
            placement.x_pos,
            placement.y_pos,
            placement.cache_key
        );
    }
    Ok(())
}
