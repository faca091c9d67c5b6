//! WASM bindings for image tiling and PDF export
//!
//! All state lives in Rust via `TileSplitSession`; JavaScript only handles
//! the file picker, the form fields and mounting one canvas per tile.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { TileSplitSession, readFileBytes, createDownloadUrl } from './pkg/tilesplit_wasm.js';
//!
//! await init();
//!
//! const session = new TileSplitSession();
//!
//! input.onchange = async () => {
//!   const ticket = session.beginLoad();
//!   const bytes = await readFileBytes(input.files[0]);
//!   const info = session.completeLoad(ticket, bytes); // throws if superseded or undecodable
//!   preview.src = info.preview;
//!   mountCanvases(session.getTiles()); // one <canvas data-tile-id="..."> per tile
//!   session.drawSurfaces([...document.querySelectorAll('canvas[data-tile-id]')]);
//! };
//!
//! rows.oninput = cols.oninput = () => {
//!   session.setGrid(rows.value, cols.value);
//!   mountCanvases(session.getTiles());
//!   session.drawSurfaces([...document.querySelectorAll('canvas[data-tile-id]')]);
//! };
//!
//! exportButton.onclick = () => {
//!   const pdf = session.exportPdf();
//!   link.href = createDownloadUrl(pdf);
//!   link.download = session.exportFilename;
//!   link.click();
//! };
//! ```

pub mod canvas;
pub mod session;

use wasm_bindgen::prelude::*;

pub use session::{GridInfo, ImageInfo, TileSplitSession};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"TileSplit WASM initialized".into());
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Read a picked file's contents
#[wasm_bindgen(js_name = readFileBytes)]
pub async fn read_file_bytes(file: web_sys::File) -> Result<js_sys::Uint8Array, JsValue> {
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await?;
    Ok(js_sys::Uint8Array::new(&buffer))
}

/// Wrap PDF bytes in a Blob and return an object URL for a download link
#[wasm_bindgen(js_name = createDownloadUrl)]
pub fn create_download_url(bytes: &[u8]) -> Result<String, JsValue> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);

    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/pdf");

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    web_sys::Url::create_object_url_with_blob(&blob)
}
