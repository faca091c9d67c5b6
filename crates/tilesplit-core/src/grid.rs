//! Grid partitioning
//!
//! Splits an image's pixel dimensions into a rows x columns grid of tiles.
//! Boundaries are floating point: `draw`-style scaling accepts fractional
//! source rectangles, so nothing is rounded here.

use serde::Serialize;
use std::fmt;

/// Render size relative to the source rectangle
pub const RENDER_SCALE: f64 = 0.5;

/// Identifier of a tile: its row-major index in the tile list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TileId(pub usize);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One rectangular region of the source image plus its render size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tile {
    pub id: TileId,
    pub row: u32,
    pub col: u32,
    /// Source rectangle, in source pixels
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
    /// Target size of the drawn tile
    pub render_width: f64,
    pub render_height: f64,
}

impl Tile {
    /// Whole-pixel size of the surface this tile is drawn into
    ///
    /// Surface dimensions are integers, so the render size is truncated,
    /// with a floor of one pixel per axis.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            (self.render_width as u32).max(1),
            (self.render_height as u32).max(1),
        )
    }
}

/// Compute the tiles of a `rows` x `cols` grid, row-major
pub fn compute_tiles(source_width: f64, source_height: f64, rows: u32, cols: u32) -> Vec<Tile> {
    let part_width = source_width / cols as f64;
    let part_height = source_height / rows as f64;

    let mut tiles = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            tiles.push(Tile {
                id: TileId(tiles.len()),
                row,
                col,
                sx: col as f64 * part_width,
                sy: row as f64 * part_height,
                sw: part_width,
                sh: part_height,
                render_width: part_width * RENDER_SCALE,
                render_height: part_height * RENDER_SCALE,
            });
        }
    }

    tracing::debug!(
        "Partitioned {}x{} into {} tiles of {:.2}x{:.2}",
        source_width,
        source_height,
        tiles.len(),
        part_width,
        part_height
    );

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_by_two_of_400x200() {
        let tiles = compute_tiles(400.0, 200.0, 2, 2);
        assert_eq!(tiles.len(), 4);

        let origins: Vec<(f64, f64)> = tiles.iter().map(|t| (t.sx, t.sy)).collect();
        assert_eq!(
            origins,
            vec![(0.0, 0.0), (200.0, 0.0), (0.0, 100.0), (200.0, 100.0)]
        );

        for tile in &tiles {
            assert_eq!((tile.sw, tile.sh), (200.0, 100.0));
            assert_eq!((tile.render_width, tile.render_height), (100.0, 50.0));
        }
    }

    #[test]
    fn test_single_tile_is_whole_image_at_half_size() {
        let tiles = compute_tiles(640.0, 480.0, 1, 1);
        assert_eq!(tiles.len(), 1);
        let tile = tiles[0];
        assert_eq!((tile.sx, tile.sy, tile.sw, tile.sh), (0.0, 0.0, 640.0, 480.0));
        assert_eq!((tile.render_width, tile.render_height), (320.0, 240.0));
    }

    #[test]
    fn test_row_major_ids() {
        let tiles = compute_tiles(90.0, 60.0, 2, 3);
        let positions: Vec<(usize, u32, u32)> =
            tiles.iter().map(|t| (t.id.0, t.row, t.col)).collect();
        assert_eq!(
            positions,
            vec![
                (0, 0, 0),
                (1, 0, 1),
                (2, 0, 2),
                (3, 1, 0),
                (4, 1, 1),
                (5, 1, 2)
            ]
        );
    }

    #[test]
    fn test_fractional_boundaries() {
        let tiles = compute_tiles(100.0, 100.0, 3, 3);
        assert!((tiles[1].sx - 100.0 / 3.0).abs() < 1e-9);
        assert!((tiles[8].sx + tiles[8].sw - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_rows_yields_no_tiles() {
        assert!(compute_tiles(100.0, 100.0, 0, 4).is_empty());
    }

    #[test]
    fn test_surface_size_truncates() {
        let tiles = compute_tiles(101.0, 3.0, 1, 1);
        assert_eq!(tiles[0].surface_size(), (50, 1));
    }

    #[test]
    fn test_tile_id_display() {
        assert_eq!(TileId(7).to_string(), "#7");
    }
}
