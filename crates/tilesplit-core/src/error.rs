use crate::grid::TileId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileSplitError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("No image loaded")]
    NoImage,

    #[error("Load request {ticket} was superseded by request {latest}")]
    StaleLoad { ticket: u64, latest: u64 },

    #[error("No surface mounted for tile {0}")]
    MissingSurface(TileId),

    #[error("Surfaces do not match tiles: {0}")]
    SurfaceMismatch(String),

    #[error("Surfaces were rendered for snapshot {surfaces}, current snapshot is {snapshot}")]
    StaleSurfaces { surfaces: u64, snapshot: u64 },

    #[error("Surface for tile {0} has not been rendered")]
    EmptySurface(TileId),

    #[error("Nothing to export")]
    EmptyExport,

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
