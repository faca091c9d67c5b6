//! Image decoding
//!
//! Turns the bytes of a user-selected file into an RGBA bitmap and a preview
//! data URL that can be assigned straight to an `<img>` element.

use crate::error::TileSplitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

/// A decoded source image
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    format: ImageFormat,
    preview: String,
}

impl SourceImage {
    /// Decode image bytes in any supported format
    pub fn decode(bytes: &[u8]) -> Result<Self, TileSplitError> {
        if bytes.is_empty() {
            return Err(TileSplitError::Decode("file is empty".into()));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| TileSplitError::Decode(format!("unrecognized format: {}", e)))?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| TileSplitError::Decode(e.to_string()))?;

        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(TileSplitError::Decode("image has no pixels".into()));
        }

        let preview = format!(
            "data:{};base64,{}",
            format.to_mime_type(),
            STANDARD.encode(bytes)
        );

        tracing::debug!(
            "Decoded {:?} image {}x{}",
            format,
            pixels.width(),
            pixels.height()
        );

        Ok(Self {
            pixels,
            format,
            preview,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Data URL of the original file bytes
    pub fn preview(&self) -> &str {
        &self.preview
    }
}
