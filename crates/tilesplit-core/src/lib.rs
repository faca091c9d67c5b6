//! Image tiling and PDF export
//!
//! This crate splits an image into a rows x columns grid, draws every tile
//! into its own surface and exports the surfaces as a PDF with one tile per
//! page, entirely client-side.
//!
//! - [`loader`]: decode file bytes into a [`SourceImage`]
//! - [`grid`]: partition pixel dimensions into [`Tile`]s
//! - [`render`]: draw tiles into [`Surface`]s keyed by [`TileId`]
//! - [`export`]: lay surfaces out on pages and serialize the PDF
//! - [`session`]: the current [`Snapshot`] and load tickets

pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod loader;
pub mod render;
pub mod session;

pub use config::{ExportConfig, GridConfig, PageOrientation, PageSize};
pub use error::TileSplitError;
pub use export::{export_document, export_png_pages, fit_to_page, ExportedDocument, Placement};
pub use grid::{compute_tiles, Tile, TileId};
pub use loader::SourceImage;
pub use render::{Surface, SurfaceSet};
pub use session::{LoadTicket, Snapshot, TileSession};
