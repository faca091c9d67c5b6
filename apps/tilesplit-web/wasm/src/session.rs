//! Stateful tiling session
//!
//! Holds the loaded image, grid and rendered surfaces in Rust memory.
//! JavaScript reads the file, mounts one canvas per tile and triggers export.

use crate::canvas::{paint_surface, tile_id_of};
use serde::Serialize;
use tilesplit_core::{
    ExportConfig, ExportedDocument, LoadTicket, Snapshot, SurfaceSet, Tile, TileId, TileSession,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

/// Image info returned after a successful load
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Data URL for an `<img>` preview
    pub preview: String,
    pub grid: GridInfo,
}

/// Effective grid after fallback and clamping
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GridInfo {
    pub rows: u32,
    pub cols: u32,
    pub requested_rows: u32,
    pub requested_cols: u32,
    pub tile_count: usize,
}

impl GridInfo {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let grid = snapshot.grid();
        let requested = snapshot.requested_grid();
        Self {
            rows: grid.rows,
            cols: grid.cols,
            requested_rows: requested.rows,
            requested_cols: requested.cols,
            tile_count: snapshot.tiles().len(),
        }
    }
}

/// Stateful session that owns the image and its tiles
#[wasm_bindgen]
pub struct TileSplitSession {
    inner: TileSession,
    surfaces: Option<SurfaceSet>,
    progress_callback: Option<js_sys::Function>,
}

impl Default for TileSplitSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl TileSplitSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: TileSession::new(),
            surfaces: None,
            progress_callback: None,
        }
    }

    /// Set a progress callback function
    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Register a new file selection; returns the ticket to complete it with
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self) -> u32 {
        self.inner.begin_load().0 as u32
    }

    /// Decode the file bytes for `ticket` and split the image
    /// Returns image info as JSON on success
    #[wasm_bindgen(js_name = completeLoad)]
    pub fn complete_load(&mut self, ticket: u32, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = self
            .complete_load_internal(ticket, bytes)
            .map_err(|e| JsValue::from_str(&e))?;

        web_sys::console::log_1(
            &format!(
                "Loaded {}x{} image into {} tiles",
                info.width, info.height, info.grid.tile_count
            )
            .into(),
        );

        to_js(&info)
    }

    /// Set rows and columns from the form fields' raw text
    #[wasm_bindgen(js_name = setGrid)]
    pub fn set_grid(&mut self, rows: &str, cols: &str) -> Result<JsValue, JsValue> {
        to_js(&self.set_grid_internal(rows, cols))
    }

    /// Current grid as JSON
    #[wasm_bindgen(js_name = getGrid)]
    pub fn get_grid(&self) -> Result<JsValue, JsValue> {
        to_js(&self.grid_info())
    }

    /// Current tiles as a JSON array, row-major
    #[wasm_bindgen(js_name = getTiles)]
    pub fn get_tiles(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.tiles())
    }

    #[wasm_bindgen(js_name = getTileCount)]
    pub fn get_tile_count(&self) -> usize {
        self.inner.tiles().len()
    }

    /// Preview data URL of the loaded file
    #[wasm_bindgen(js_name = getPreview)]
    pub fn get_preview(&self) -> Option<String> {
        self.inner
            .snapshot()
            .map(|snapshot| snapshot.image().preview().to_string())
    }

    /// Draw one tile into its canvas
    #[wasm_bindgen(js_name = drawTile)]
    pub fn draw_tile(&mut self, canvas: &HtmlCanvasElement, tile_id: u32) -> Result<(), JsValue> {
        let surfaces = self.current_surfaces().map_err(|e| JsValue::from_str(&e))?;
        let surface = surfaces
            .get(TileId(tile_id as usize))
            .ok_or_else(|| JsValue::from_str(&format!("No tile #{}", tile_id)))?;
        paint_surface(canvas, surface)
    }

    /// Draw every tile into the canvas carrying its `data-tile-id`
    ///
    /// Call whenever the set of mounted canvases changes. Fails without
    /// drawing anything if the canvases do not match the tiles one to one.
    #[wasm_bindgen(js_name = drawSurfaces)]
    pub fn draw_surfaces(&mut self, canvases: js_sys::Array) -> Result<u32, JsValue> {
        let canvases: Vec<HtmlCanvasElement> = canvases
            .iter()
            .map(|value| {
                value
                    .dyn_into::<HtmlCanvasElement>()
                    .map_err(|_| JsValue::from_str("Expected an array of canvas elements"))
            })
            .collect::<Result<_, _>>()?;

        let ids: Vec<Option<usize>> = canvases.iter().map(tile_id_of).collect();
        self.check_mounted(&ids).map_err(|e| {
            web_sys::console::warn_1(&e.clone().into());
            JsValue::from_str(&e)
        })?;

        let surfaces = self.current_surfaces().map_err(|e| JsValue::from_str(&e))?;
        for (canvas, id) in canvases.iter().zip(ids) {
            if let Some(surface) = id.and_then(|id| surfaces.get(TileId(id))) {
                paint_surface(canvas, surface)?;
            }
        }

        Ok(canvases.len() as u32)
    }

    /// Replace export options from JSON; omitted fields keep their defaults
    #[wasm_bindgen(js_name = setExportOptions)]
    pub fn set_export_options(&mut self, json: &str) -> Result<(), JsValue> {
        self.set_export_options_internal(json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(getter, js_name = exportFilename)]
    pub fn export_filename(&self) -> String {
        self.inner.export_config().filename.clone()
    }

    #[wasm_bindgen(js_name = canExport)]
    pub fn can_export(&self) -> bool {
        !self.inner.tiles().is_empty()
    }

    /// Export every tile as one PDF page; returns the PDF bytes
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        if !self.can_export() {
            return Err(JsValue::from_str("No image loaded"));
        }

        self.report_progress(0, 100, "Starting...")?;
        self.report_progress(10, 100, "Rendering tiles...")?;

        let exported = self
            .export_internal()
            .map_err(|e| JsValue::from_str(&format!("Export failed: {}", e)))?;

        self.report_progress(100, 100, "Complete")?;

        web_sys::console::log_1(
            &format!(
                "Exported {} pages ({} bytes)",
                exported.page_count,
                exported.bytes.len()
            )
            .into(),
        );

        let array = js_sys::Uint8Array::new_with_length(exported.bytes.len() as u32);
        array.copy_from(&exported.bytes);
        Ok(array)
    }
}

impl TileSplitSession {
    fn complete_load_internal(&mut self, ticket: u32, bytes: &[u8]) -> Result<ImageInfo, String> {
        let snapshot = self
            .inner
            .complete_load(LoadTicket(ticket as u64), bytes)
            .map_err(|e| e.to_string())?;
        self.surfaces = Some(snapshot.render());

        let image = snapshot.image();
        Ok(ImageInfo {
            width: image.width(),
            height: image.height(),
            format: format!("{:?}", image.format()),
            preview: image.preview().to_string(),
            grid: GridInfo::from_snapshot(&snapshot),
        })
    }

    fn set_grid_internal(&mut self, rows: &str, cols: &str) -> GridInfo {
        if let Some(snapshot) = self.inner.set_grid_input(rows, cols) {
            self.surfaces = Some(snapshot.render());
        }
        self.grid_info()
    }

    fn grid_info(&self) -> GridInfo {
        match self.inner.snapshot() {
            Some(snapshot) => GridInfo::from_snapshot(&snapshot),
            None => {
                let grid = self.inner.grid();
                GridInfo {
                    rows: grid.rows,
                    cols: grid.cols,
                    requested_rows: grid.rows,
                    requested_cols: grid.cols,
                    tile_count: 0,
                }
            }
        }
    }

    fn set_export_options_internal(&mut self, json: &str) -> Result<(), String> {
        let config = ExportConfig::from_json(json).map_err(|e| e.to_string())?;
        self.inner
            .set_export_config(config)
            .map_err(|e| e.to_string())
    }

    /// Surfaces for the current snapshot, re-rendered if they are out of date
    fn current_surfaces(&mut self) -> Result<&SurfaceSet, String> {
        let snapshot = self.inner.snapshot().ok_or("No image loaded")?;

        let stale = self
            .surfaces
            .as_ref()
            .map_or(true, |s| s.generation() != snapshot.generation());
        if stale {
            self.surfaces = Some(snapshot.render());
        }

        self.surfaces.as_ref().ok_or_else(|| "No surfaces".to_string())
    }

    /// Check that mounted canvases and tiles pair up one to one by id
    fn check_mounted(&self, ids: &[Option<usize>]) -> Result<(), String> {
        let tiles: &[Tile] = self.inner.tiles();

        if let Some(position) = ids.iter().position(Option::is_none) {
            return Err(format!("Canvas {} has no valid data-tile-id", position));
        }

        let mut seen = vec![false; tiles.len()];
        for id in ids.iter().flatten() {
            match seen.get_mut(*id) {
                Some(true) => return Err(format!("Tile #{} is mounted twice", id)),
                Some(flag) => *flag = true,
                None => return Err(format!("No tile #{} (grid has {})", id, tiles.len())),
            }
        }

        let generation = self.inner.snapshot().map_or(0, |s| s.generation());
        SurfaceSet::mount(generation, ids.iter().flatten().map(|id| TileId(*id)))
            .ordered(tiles)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn export_internal(&mut self) -> Result<ExportedDocument, String> {
        self.current_surfaces()?;
        let surfaces = self.surfaces.as_ref().ok_or("No surfaces")?;
        self.inner.export(surfaces).map_err(|e| e.to_string())
    }

    /// Report progress to JavaScript callback
    fn report_progress(&self, current: u32, total: u32, message: &str) -> Result<(), JsValue> {
        if let Some(ref callback) = self.progress_callback {
            let this = JsValue::null();
            let _ = callback.call3(
                &this,
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
        Ok(())
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
