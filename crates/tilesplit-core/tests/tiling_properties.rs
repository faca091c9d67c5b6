//! Property tests for partitioning, page fitting and the load-to-export flow

use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::Document;
use proptest::prelude::*;
use std::io::Cursor;
use tilesplit_core::{
    compute_tiles, fit_to_page, ExportConfig, GridConfig, TileSession, TileSplitError,
};

const EPSILON: f64 = 1e-6;

fn png_of(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

// ============================================================
// Partitioning
// ============================================================

proptest! {
    /// Property: one tile per (row, col), in row-major order
    #[test]
    fn tiles_are_row_major(
        width in 1.0f64..5000.0,
        height in 1.0f64..5000.0,
        rows in 1u32..20,
        cols in 1u32..20,
    ) {
        let tiles = compute_tiles(width, height, rows, cols);
        prop_assert_eq!(tiles.len(), (rows * cols) as usize);

        for (index, tile) in tiles.iter().enumerate() {
            prop_assert_eq!(tile.id.0, index);
            prop_assert_eq!(tile.row, index as u32 / cols);
            prop_assert_eq!(tile.col, index as u32 % cols);
        }
    }

    /// Property: source rectangles cover the image with no gaps or overlaps
    #[test]
    fn tiles_cover_the_image_exactly(
        width in 1.0f64..5000.0,
        height in 1.0f64..5000.0,
        rows in 1u32..20,
        cols in 1u32..20,
    ) {
        let tiles = compute_tiles(width, height, rows, cols);

        for row in 0..rows {
            let row_tiles: Vec<_> = tiles.iter().filter(|t| t.row == row).collect();
            let total: f64 = row_tiles.iter().map(|t| t.sw).sum();
            prop_assert!((total - width).abs() < EPSILON);

            for pair in row_tiles.windows(2) {
                prop_assert!((pair[0].sx + pair[0].sw - pair[1].sx).abs() < EPSILON);
            }
        }

        for col in 0..cols {
            let col_tiles: Vec<_> = tiles.iter().filter(|t| t.col == col).collect();
            let total: f64 = col_tiles.iter().map(|t| t.sh).sum();
            prop_assert!((total - height).abs() < EPSILON);

            for pair in col_tiles.windows(2) {
                prop_assert!((pair[0].sy + pair[0].sh - pair[1].sy).abs() < EPSILON);
            }
        }
    }

    /// Property: render size is half the source rectangle
    #[test]
    fn render_size_is_half_source(
        width in 1.0f64..5000.0,
        height in 1.0f64..5000.0,
        rows in 1u32..10,
        cols in 1u32..10,
    ) {
        for tile in compute_tiles(width, height, rows, cols) {
            prop_assert_eq!(tile.render_width, tile.sw / 2.0);
            prop_assert_eq!(tile.render_height, tile.sh / 2.0);
        }
    }

    /// Property: identical inputs give identical output
    #[test]
    fn partitioning_is_deterministic(
        width in 1.0f64..5000.0,
        height in 1.0f64..5000.0,
        rows in 1u32..20,
        cols in 1u32..20,
    ) {
        prop_assert_eq!(
            compute_tiles(width, height, rows, cols),
            compute_tiles(width, height, rows, cols)
        );
    }

    /// Property: free-text input always yields a usable grid
    #[test]
    fn parsed_grid_is_always_positive(rows in ".{0,12}", cols in ".{0,12}") {
        let grid = GridConfig::parse(&rows, &cols);
        prop_assert!(grid.rows >= 1);
        prop_assert!(grid.cols >= 1);
    }
}

// ============================================================
// Page fitting
// ============================================================

proptest! {
    /// Property: the placement stays inside the printable area and keeps the ratio
    #[test]
    fn placement_fits_and_preserves_ratio(
        image_width in 1.0f64..4000.0,
        image_height in 1.0f64..4000.0,
        margin in 0.0f64..50.0,
    ) {
        let (page_width, page_height) = (210.0, 297.0);
        let p = fit_to_page(page_width, page_height, margin, image_width, image_height);

        prop_assert!(p.x >= margin - EPSILON);
        prop_assert!(p.y >= margin - EPSILON);
        prop_assert!(p.x + p.width <= page_width - margin + EPSILON);
        prop_assert!(p.y + p.height <= page_height - margin + EPSILON);

        let ratio = image_width / image_height;
        prop_assert!((p.width / p.height - ratio).abs() < 1e-6 * ratio.max(1.0));

        // One dimension always touches the printable area
        let fills_width = (p.width - (page_width - 2.0 * margin)).abs() < EPSILON;
        let fills_height = (p.height - (page_height - 2.0 * margin)).abs() < EPSILON;
        prop_assert!(fills_width || fills_height);
    }
}

// ============================================================
// Load to export
// ============================================================

#[test]
fn wide_image_scenario() {
    let mut session = TileSession::new();
    let snapshot = session.load(&png_of(400, 200)).unwrap();

    let tiles = snapshot.tiles();
    assert_eq!(tiles.len(), 4);
    for tile in tiles {
        assert!(tile.sx == 0.0 || tile.sx == 200.0);
        assert!(tile.sy == 0.0 || tile.sy == 100.0);
        assert_eq!((tile.sw, tile.sh), (200.0, 100.0));
        assert_eq!(tile.surface_size(), (100, 50));
    }

    let surfaces = session.render_surfaces().unwrap();
    let exported = session.export(&surfaces).unwrap();
    assert_eq!(exported.filename, "split-image.pdf");

    let doc = Document::load_mem(&exported.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 4);
}

#[test]
fn page_count_follows_grid_changes() {
    let mut session = TileSession::new();
    session.load(&png_of(120, 90)).unwrap();

    for (rows, cols, expected) in [("1", "3", 3), ("0", "5", 10), ("3", "3", 9)] {
        session.set_grid_input(rows, cols).unwrap();
        let surfaces = session.render_surfaces().unwrap();
        let exported = session.export(&surfaces).unwrap();
        assert_eq!(exported.page_count, expected);

        let doc = Document::load_mem(&exported.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), expected as usize);
    }
}

#[test]
fn newer_load_wins_over_slower_older_load() {
    let mut session = TileSession::new();
    let slow = session.begin_load();
    let fast = session.begin_load();

    session.complete_load(fast, &png_of(64, 32)).unwrap();
    let late = session.complete_load(slow, &png_of(8, 8));

    assert!(matches!(late, Err(TileSplitError::StaleLoad { .. })));
    let snapshot = session.snapshot().unwrap();
    assert_eq!(
        (snapshot.image().width(), snapshot.image().height()),
        (64, 32)
    );
}

#[test]
fn letter_landscape_export() {
    let config =
        ExportConfig::from_json(r#"{"page_size":"letter","orientation":"landscape","margin_mm":5}"#)
            .unwrap();
    let mut session = TileSession::with_export_config(config);
    session.set_grid_input("1", "2");
    session.load(&png_of(50, 50)).unwrap();

    let surfaces = session.render_surfaces().unwrap();
    let exported = session.export(&surfaces).unwrap();
    assert_eq!(exported.page_count, 2);
}
