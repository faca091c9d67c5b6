//! Tile session state
//!
//! The loaded image, the grid and the tiles derived from them live in one
//! immutable [`Snapshot`]. Any change builds a new snapshot and swaps it in
//! whole, so a reader never sees tiles from one image paired with another.
//!
//! Loads are identified by tickets. Only the most recently issued ticket may
//! complete; a slow decode that finishes after a newer file was picked is
//! refused instead of overwriting it.

use crate::config::{ExportConfig, GridConfig};
use crate::error::TileSplitError;
use crate::export::{export_document, ExportedDocument};
use crate::grid::{compute_tiles, Tile};
use crate::loader::SourceImage;
use crate::render::SurfaceSet;
use std::sync::Arc;

/// Identifies one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// Image, effective grid and tiles, always consistent with each other
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    image: Arc<SourceImage>,
    requested: GridConfig,
    grid: GridConfig,
    tiles: Vec<Tile>,
}

impl Snapshot {
    fn build(generation: u64, image: Arc<SourceImage>, requested: GridConfig) -> Self {
        let grid = requested.clamped_to(image.width(), image.height());
        if grid != requested {
            tracing::warn!(
                "Grid {}x{} exceeds image {}x{}, using {}x{}",
                requested.rows,
                requested.cols,
                image.width(),
                image.height(),
                grid.rows,
                grid.cols
            );
        }

        let tiles = compute_tiles(
            image.width() as f64,
            image.height() as f64,
            grid.rows,
            grid.cols,
        );

        Self {
            generation,
            image,
            requested,
            grid,
            tiles,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image(&self) -> &SourceImage {
        &self.image
    }

    /// Grid as entered by the user
    pub fn requested_grid(&self) -> GridConfig {
        self.requested
    }

    /// Grid the tiles were computed with
    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Mount and draw a surface for every tile
    pub fn render(&self) -> SurfaceSet {
        SurfaceSet::render(self.generation, &self.image, &self.tiles)
    }

    /// Redraw mounted surfaces from this snapshot's tiles
    pub fn redraw(&self, surfaces: &mut SurfaceSet) -> Result<(), TileSplitError> {
        surfaces.redraw(self.generation, &self.image, &self.tiles)
    }
}

/// Holds the current snapshot and the settings that produce the next one
#[derive(Debug, Default)]
pub struct TileSession {
    grid: GridConfig,
    export_config: ExportConfig,
    snapshot: Option<Arc<Snapshot>>,
    latest_ticket: u64,
    generation: u64,
}

impl TileSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export_config(export_config: ExportConfig) -> Self {
        Self {
            export_config,
            ..Self::default()
        }
    }

    /// Start a load; any earlier unfinished load becomes stale
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        LoadTicket(self.latest_ticket)
    }

    /// Finish a load with the file's bytes
    ///
    /// On failure the previous snapshot is kept.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        bytes: &[u8],
    ) -> Result<Arc<Snapshot>, TileSplitError> {
        self.check_ticket(ticket)?;
        let image = SourceImage::decode(bytes)?;

        tracing::info!(
            "Loaded image {}x{} (request {})",
            image.width(),
            image.height(),
            ticket.0
        );

        Ok(self.replace_snapshot(Arc::new(image)))
    }

    /// Begin and complete a load in one step
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<Snapshot>, TileSplitError> {
        let ticket = self.begin_load();
        self.complete_load(ticket, bytes)
    }

    /// Replace the grid, recomputing tiles if an image is loaded
    ///
    /// A zero row or column count falls back to the default.
    pub fn set_grid(&mut self, grid: GridConfig) -> Option<Arc<Snapshot>> {
        self.grid = grid.or_default_dimensions();
        let image = self.snapshot.as_ref().map(|s| Arc::clone(&s.image))?;
        Some(self.replace_snapshot(image))
    }

    /// Replace the grid from free-text form input
    pub fn set_grid_input(&mut self, rows: &str, cols: &str) -> Option<Arc<Snapshot>> {
        self.set_grid(GridConfig::parse(rows, cols))
    }

    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    pub fn export_config(&self) -> &ExportConfig {
        &self.export_config
    }

    pub fn set_export_config(&mut self, config: ExportConfig) -> Result<(), TileSplitError> {
        config.validate()?;
        self.export_config = config;
        Ok(())
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Tiles of the current snapshot, empty when no image is loaded
    pub fn tiles(&self) -> &[Tile] {
        self.snapshot.as_deref().map(Snapshot::tiles).unwrap_or(&[])
    }

    /// Draw every tile of the current snapshot
    pub fn render_surfaces(&self) -> Result<SurfaceSet, TileSplitError> {
        let snapshot = self.snapshot.as_ref().ok_or(TileSplitError::NoImage)?;
        Ok(snapshot.render())
    }

    /// Export surfaces rendered from the current snapshot
    pub fn export(&self, surfaces: &SurfaceSet) -> Result<ExportedDocument, TileSplitError> {
        let snapshot = self.snapshot.as_ref().ok_or(TileSplitError::NoImage)?;

        if surfaces.generation() != snapshot.generation {
            return Err(TileSplitError::StaleSurfaces {
                surfaces: surfaces.generation(),
                snapshot: snapshot.generation,
            });
        }

        let ordered = surfaces.ordered(&snapshot.tiles)?;
        export_document(&ordered, &self.export_config)
    }

    fn check_ticket(&self, ticket: LoadTicket) -> Result<(), TileSplitError> {
        if ticket.0 != self.latest_ticket {
            tracing::warn!(
                "Ignoring load request {}, latest is {}",
                ticket.0,
                self.latest_ticket
            );
            return Err(TileSplitError::StaleLoad {
                ticket: ticket.0,
                latest: self.latest_ticket,
            });
        }
        Ok(())
    }

    fn replace_snapshot(&mut self, image: Arc<SourceImage>) -> Arc<Snapshot> {
        self.generation += 1;
        let snapshot = Arc::new(Snapshot::build(self.generation, image, self.grid));
        self.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }
}
