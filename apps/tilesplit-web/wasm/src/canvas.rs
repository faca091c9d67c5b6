//! Canvas drawing
//!
//! Surfaces are rendered in Rust; a canvas only receives the finished pixels.
//! Each canvas names its tile through a `data-tile-id` attribute.

use tilesplit_core::Surface;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// Attribute carrying the tile id on every tile canvas
pub const TILE_ID_ATTRIBUTE: &str = "data-tile-id";

/// Read the tile id a canvas was mounted for
pub fn tile_id_of(canvas: &HtmlCanvasElement) -> Option<usize> {
    parse_tile_id(&canvas.get_attribute(TILE_ID_ATTRIBUTE)?)
}

pub fn parse_tile_id(value: &str) -> Option<usize> {
    value.trim().parse().ok()
}

/// Resize the canvas to the surface and copy its pixels in
pub fn paint_surface(canvas: &HtmlCanvasElement, surface: &Surface) -> Result<(), JsValue> {
    let raster = surface
        .raster()
        .ok_or_else(|| JsValue::from_str(&format!("Tile {} is not rendered", surface.tile_id())))?;

    canvas.set_width(raster.width());
    canvas.set_height(raster.height());

    let context = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Canvas has no 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;

    let image_data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(raster.as_raw().as_slice()),
        raster.width(),
        raster.height(),
    )?;
    context.put_image_data(&image_data, 0.0, 0.0)
}
