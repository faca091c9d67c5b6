//! Tile rendering
//!
//! Each tile is drawn into its own surface. Surfaces are keyed by [`TileId`],
//! so a surface always receives the tile carrying the same id regardless of
//! the order in which the view mounted them.

use crate::error::TileSplitError;
use crate::grid::{Tile, TileId};
use crate::loader::SourceImage;
use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;

/// A raster target bound to one tile
#[derive(Debug, Clone)]
pub struct Surface {
    tile_id: TileId,
    raster: Option<RgbaImage>,
}

impl Surface {
    /// A mounted surface that has not been drawn yet
    pub fn blank(tile_id: TileId) -> Self {
        Self {
            tile_id,
            raster: None,
        }
    }

    pub fn tile_id(&self) -> TileId {
        self.tile_id
    }

    pub fn is_rendered(&self) -> bool {
        self.raster.is_some()
    }

    pub fn raster(&self) -> Option<&RgbaImage> {
        self.raster.as_ref()
    }

    /// Pixel size, or (0, 0) while blank
    pub fn dimensions(&self) -> (u32, u32) {
        self.raster
            .as_ref()
            .map(|r| r.dimensions())
            .unwrap_or((0, 0))
    }

    /// Resize to the tile's render size and copy its source rectangle in
    pub fn draw(&mut self, source: &SourceImage, tile: &Tile) {
        self.raster = Some(draw_tile(source.pixels(), tile));
    }

    /// Serialize the surface's pixels as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, TileSplitError> {
        let raster = self
            .raster
            .as_ref()
            .ok_or(TileSplitError::EmptySurface(self.tile_id))?;

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, raster.width(), raster.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| TileSplitError::Encode(format!("PNG header: {}", e)))?;
        writer
            .write_image_data(raster.as_raw())
            .map_err(|e| TileSplitError::Encode(format!("PNG data: {}", e)))?;
        writer
            .finish()
            .map_err(|e| TileSplitError::Encode(format!("PNG finish: {}", e)))?;

        Ok(out)
    }
}

/// Copy `tile`'s source rectangle out of `pixels`, scaled to the tile's surface size
///
/// Sampling is area-weighted over the exact fractional rectangle: a source pixel
/// split between two tiles contributes to each in proportion to its coverage.
/// Colour is averaged with premultiplied alpha.
pub fn draw_tile(pixels: &RgbaImage, tile: &Tile) -> RgbaImage {
    let (target_width, target_height) = tile.surface_size();
    let columns = axis_weights(tile.sx, tile.sw, target_width, pixels.width());
    let rows = axis_weights(tile.sy, tile.sh, target_height, pixels.height());

    RgbaImage::from_fn(target_width, target_height, |x, y| {
        let mut colour = [0.0f64; 3];
        let mut alpha = 0.0;
        let mut total = 0.0;

        for &(sy, wy) in &rows[y as usize] {
            for &(sx, wx) in &columns[x as usize] {
                let weight = wx * wy;
                let Rgba([r, g, b, a]) = *pixels.get_pixel(sx, sy);
                let coverage = a as f64 * weight;
                colour[0] += r as f64 * coverage;
                colour[1] += g as f64 * coverage;
                colour[2] += b as f64 * coverage;
                alpha += coverage;
                total += weight;
            }
        }

        if alpha <= 0.0 || total <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Rgba([
            channel(colour[0] / alpha),
            channel(colour[1] / alpha),
            channel(colour[2] / alpha),
            channel(alpha / total),
        ])
    })
}

/// For each of `target` output pixels along one axis, the source pixels it
/// covers within `[start, start + len)` and the length of each overlap
fn axis_weights(start: f64, len: f64, target: u32, limit: u32) -> Vec<Vec<(u32, f64)>> {
    let step = len / target as f64;
    let last = limit.saturating_sub(1);

    (0..target)
        .map(|d| {
            let a = (start + d as f64 * step).clamp(0.0, limit as f64);
            let b = (a + step).clamp(0.0, limit as f64);

            let mut weights: Vec<(u32, f64)> = (a.floor() as u32..b.ceil() as u32)
                .filter_map(|i| {
                    let overlap = b.min(i as f64 + 1.0) - a.max(i as f64);
                    (overlap > 0.0).then_some((i.min(last), overlap))
                })
                .collect();

            // Degenerate span at the image edge: take the nearest pixel
            if weights.is_empty() {
                weights.push(((a as u32).min(last), 1.0));
            }
            weights
        })
        .collect()
}

/// The surfaces of one snapshot generation, keyed by tile id
#[derive(Debug, Clone, Default)]
pub struct SurfaceSet {
    generation: u64,
    surfaces: BTreeMap<TileId, Surface>,
}

impl SurfaceSet {
    /// Mount blank surfaces for the given ids
    pub fn mount(generation: u64, ids: impl IntoIterator<Item = TileId>) -> Self {
        Self {
            generation,
            surfaces: ids.into_iter().map(|id| (id, Surface::blank(id))).collect(),
        }
    }

    /// Mount and draw one surface per tile
    pub fn render(generation: u64, source: &SourceImage, tiles: &[Tile]) -> Self {
        let surfaces = tiles
            .iter()
            .map(|tile| {
                let mut surface = Surface::blank(tile.id);
                surface.draw(source, tile);
                (tile.id, surface)
            })
            .collect();

        tracing::debug!("Rendered {} surfaces for snapshot {}", tiles.len(), generation);

        Self {
            generation,
            surfaces,
        }
    }

    /// Redraw every mounted surface from `tiles`
    ///
    /// The mounted ids must match the tile ids exactly; nothing is drawn otherwise.
    pub fn redraw(
        &mut self,
        generation: u64,
        source: &SourceImage,
        tiles: &[Tile],
    ) -> Result<(), TileSplitError> {
        self.check_pairing(tiles)?;

        for tile in tiles {
            if let Some(surface) = self.surfaces.get_mut(&tile.id) {
                surface.draw(source, tile);
            }
        }
        self.generation = generation;

        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn get(&self, id: TileId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    /// Surfaces in tile order, after checking every tile has exactly one surface
    pub fn ordered<'a>(&'a self, tiles: &[Tile]) -> Result<Vec<&'a Surface>, TileSplitError> {
        self.check_pairing(tiles)?;
        tiles
            .iter()
            .map(|tile| {
                self.surfaces
                    .get(&tile.id)
                    .ok_or(TileSplitError::MissingSurface(tile.id))
            })
            .collect()
    }

    fn check_pairing(&self, tiles: &[Tile]) -> Result<(), TileSplitError> {
        if let Some(tile) = tiles.iter().find(|t| !self.surfaces.contains_key(&t.id)) {
            return Err(TileSplitError::MissingSurface(tile.id));
        }

        if self.surfaces.len() != tiles.len() {
            let orphans: Vec<String> = self
                .surfaces
                .keys()
                .filter(|id| !tiles.iter().any(|t| t.id == **id))
                .map(|id| id.to_string())
                .collect();
            return Err(TileSplitError::SurfaceMismatch(format!(
                "{} surfaces for {} tiles; no tile for surfaces {}",
                self.surfaces.len(),
                tiles.len(),
                orphans.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::compute_tiles;
    use image::ImageFormat;
    use std::io::Cursor;

    /// Four-quadrant image: red, green / blue, white
    fn quadrant_source(width: u32, height: u32) -> SourceImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            match (x < width / 2, y < height / 2) {
                (true, true) => Rgba([255, 0, 0, 255]),
                (false, true) => Rgba([0, 255, 0, 255]),
                (true, false) => Rgba([0, 0, 255, 255]),
                (false, false) => Rgba([255, 255, 255, 255]),
            }
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        SourceImage::decode(&bytes).unwrap()
    }

    #[test]
    fn test_draw_tile_scales_to_render_size() {
        let source = quadrant_source(400, 200);
        let tiles = compute_tiles(400.0, 200.0, 2, 2);
        let raster = draw_tile(source.pixels(), &tiles[0]);
        assert_eq!(raster.dimensions(), (100, 50));
    }

    #[test]
    fn test_draw_tile_copies_the_right_quadrant() {
        let source = quadrant_source(400, 200);
        let tiles = compute_tiles(400.0, 200.0, 2, 2);
        let expected = [
            Rgba([255, 0, 0, 255]),
            Rgba([0, 255, 0, 255]),
            Rgba([0, 0, 255, 255]),
            Rgba([255, 255, 255, 255]),
        ];
        for (tile, colour) in tiles.iter().zip(expected) {
            let raster = draw_tile(source.pixels(), tile);
            assert_eq!(raster.get_pixel(50, 25), &colour, "tile {}", tile.id);
        }
    }

    #[test]
    fn test_draw_tile_fractional_edges_stay_in_bounds() {
        let source = quadrant_source(10, 7);
        for tile in compute_tiles(10.0, 7.0, 3, 3) {
            let raster = draw_tile(source.pixels(), &tile);
            assert_eq!(raster.dimensions(), tile.surface_size());
        }
    }

    #[test]
    fn test_draw_tile_weights_shared_edge_pixel() {
        // Two columns over three pixels: the middle pixel is split in half
        let pixels = RgbaImage::from_fn(3, 1, |x, _| {
            let v = (x * 80) as u8;
            Rgba([v, v, v, 255])
        });
        let tiles = compute_tiles(3.0, 1.0, 1, 2);

        let left = draw_tile(&pixels, &tiles[0]);
        let right = draw_tile(&pixels, &tiles[1]);
        assert_eq!(left.get_pixel(0, 0), &Rgba([27, 27, 27, 255]));
        assert_eq!(right.get_pixel(0, 0), &Rgba([133, 133, 133, 255]));
    }

    #[test]
    fn test_draw_tile_ignores_transparent_colour() {
        let pixels = RgbaImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 0])
            }
        });
        let tiles = compute_tiles(2.0, 2.0, 1, 1);
        let raster = draw_tile(&pixels, &tiles[0]);
        assert_eq!(raster.get_pixel(0, 0), &Rgba([255, 0, 0, 128]));
    }

    #[test]
    fn test_blank_surface_refuses_png() {
        let surface = Surface::blank(TileId(3));
        assert!(!surface.is_rendered());
        assert_eq!(surface.dimensions(), (0, 0));
        assert!(matches!(
            surface.to_png(),
            Err(TileSplitError::EmptySurface(TileId(3)))
        ));
    }

    #[test]
    fn test_surface_png_is_lossless() {
        let source = quadrant_source(40, 40);
        let tiles = compute_tiles(40.0, 40.0, 1, 1);
        let mut surface = Surface::blank(tiles[0].id);
        surface.draw(&source, &tiles[0]);

        let png = surface.to_png().unwrap();
        let reread = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(Some(&reread), surface.raster());
    }

    #[test]
    fn test_render_set_matches_tiles() {
        let source = quadrant_source(400, 200);
        let tiles = compute_tiles(400.0, 200.0, 2, 3);
        let set = SurfaceSet::render(4, &source, &tiles);
        assert_eq!(set.len(), 6);
        assert_eq!(set.generation(), 4);
        assert!(set.iter().all(Surface::is_rendered));

        let ordered = set.ordered(&tiles).unwrap();
        let ids: Vec<TileId> = ordered.iter().map(|s| s.tile_id()).collect();
        let expected: Vec<TileId> = tiles.iter().map(|t| t.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_redraw_pairs_by_id_not_mount_order() {
        let source = quadrant_source(400, 200);
        let tiles = compute_tiles(400.0, 200.0, 2, 2);

        // Mounted in reverse order
        let mut set = SurfaceSet::mount(1, tiles.iter().rev().map(|t| t.id));
        set.redraw(1, &source, &tiles).unwrap();

        let top_right = set.get(TileId(1)).unwrap().raster().unwrap();
        assert_eq!(top_right.get_pixel(10, 10), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_redraw_reports_missing_surface() {
        let source = quadrant_source(40, 40);
        let tiles = compute_tiles(40.0, 40.0, 2, 2);
        let mut set = SurfaceSet::mount(1, (0..3).map(TileId));

        let result = set.redraw(1, &source, &tiles);
        assert!(matches!(result, Err(TileSplitError::MissingSurface(TileId(3)))));
        assert!(set.iter().all(|s| !s.is_rendered()));
    }

    #[test]
    fn test_redraw_reports_extra_surfaces() {
        let source = quadrant_source(40, 40);
        let tiles = compute_tiles(40.0, 40.0, 1, 2);
        let mut set = SurfaceSet::mount(1, (0..4).map(TileId));

        match set.redraw(1, &source, &tiles) {
            Err(TileSplitError::SurfaceMismatch(msg)) => {
                assert!(msg.contains("#2, #3"), "unexpected message: {}", msg)
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }
}
