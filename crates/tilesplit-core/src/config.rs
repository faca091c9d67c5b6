//! Grid and export configuration
//!
//! Grid dimensions arrive as free text from two form fields and never fail to
//! parse: anything that is not a positive integer becomes the default.
//! Export options arrive as JSON and are validated before use.

use crate::error::TileSplitError;
use serde::{Deserialize, Serialize};

/// Rows/columns used when input is missing, non-numeric or not positive
pub const DEFAULT_DIMENSION: u32 = 2;

/// Default output filename
pub const DEFAULT_FILENAME: &str = "split-image.pdf";

/// Default margin on every page edge, in millimetres
pub const DEFAULT_MARGIN_MM: f64 = 10.0;

/// Number of rows and columns to split the image into
///
/// Deserialization goes through [`GridConfig::new`], so zero is rejected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
}

#[derive(Deserialize)]
struct RawGrid {
    rows: u32,
    cols: u32,
}

impl TryFrom<RawGrid> for GridConfig {
    type Error = TileSplitError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        Self::new(raw.rows, raw.cols)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_DIMENSION,
            cols: DEFAULT_DIMENSION,
        }
    }
}

impl GridConfig {
    /// Create a grid, rejecting zero rows or columns
    pub fn new(rows: u32, cols: u32) -> Result<Self, TileSplitError> {
        if rows == 0 || cols == 0 {
            return Err(TileSplitError::InvalidGrid(format!(
                "rows and columns must be >= 1 (got {}x{})",
                rows, cols
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Build a grid from free-text form input, falling back per field
    pub fn parse(rows: &str, cols: &str) -> Self {
        Self {
            rows: parse_dimension(rows),
            cols: parse_dimension(cols),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Replace a zero row or column count with [`DEFAULT_DIMENSION`]
    pub fn or_default_dimensions(&self) -> Self {
        let fallback = |n: u32| if n == 0 { DEFAULT_DIMENSION } else { n };
        Self {
            rows: fallback(self.rows),
            cols: fallback(self.cols),
        }
    }

    /// Limit the grid so that every tile covers at least one source pixel per axis
    pub fn clamped_to(&self, width: u32, height: u32) -> Self {
        let grid = self.or_default_dimensions();
        Self {
            rows: grid.rows.min(height.max(1)),
            cols: grid.cols.min(width.max(1)),
        }
    }
}

/// Parse one grid dimension using leading-integer semantics ("3x" is 3)
///
/// Empty, non-numeric, zero and negative input all yield [`DEFAULT_DIMENSION`].
pub fn parse_dimension(input: &str) -> u32 {
    let trimmed = input.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '+' || c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());

    match trimmed[..end].parse::<i64>() {
        Ok(value) if value >= 1 => value.min(u32::MAX as i64) as u32,
        Ok(_) => DEFAULT_DIMENSION,
        // Digits that overflow i64 are still a positive number
        Err(_) if is_unsigned_digits(&trimmed[..end]) => u32::MAX,
        Err(_) => DEFAULT_DIMENSION,
    }
}

fn is_unsigned_digits(text: &str) -> bool {
    let digits = text.strip_prefix('+').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Output paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Portrait width and height in millimetres
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Output page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// PDF export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub page_size: PageSize,
    pub orientation: PageOrientation,
    /// Margin on every edge, in millimetres
    pub margin_mm: f64,
    pub filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            orientation: PageOrientation::default(),
            margin_mm: DEFAULT_MARGIN_MM,
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl ExportConfig {
    /// Parse and validate options from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TileSplitError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TileSplitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TileSplitError> {
        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(TileSplitError::Config(format!(
                "margin must be a non-negative number (got {})",
                self.margin_mm
            )));
        }

        let (width, height) = self.printable_area();
        if width <= 0.0 || height <= 0.0 {
            return Err(TileSplitError::Config(format!(
                "margin of {} mm leaves no printable area",
                self.margin_mm
            )));
        }

        if self.filename.trim().is_empty() {
            return Err(TileSplitError::Config("filename must not be empty".into()));
        }

        Ok(())
    }

    /// Page width and height in millimetres, accounting for orientation
    pub fn page_dimensions(&self) -> (f64, f64) {
        let (width, height) = self.page_size.dimensions_mm();
        match self.orientation {
            PageOrientation::Portrait => (width, height),
            PageOrientation::Landscape => (height, width),
        }
    }

    /// Page dimensions minus the margin on all sides
    pub fn printable_area(&self) -> (f64, f64) {
        let (width, height) = self.page_dimensions();
        (
            width - 2.0 * self.margin_mm,
            height - 2.0 * self.margin_mm,
        )
    }
}
