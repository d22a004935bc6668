use depthcloud_data::PlyError;
use thiserror::Error;

/// Errors that can occur while building or saving a point cloud.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("Frame sizes disagree: color {color:?}, depth {depth:?}, intrinsics {intrinsics:?}")]
    DimensionMismatch {
        color: (u32, u32),
        depth: (u32, u32),
        intrinsics: (u32, u32),
    },

    #[error("Depth frame has no valid pixels; refusing to write an empty point cloud")]
    EmptyCloud,

    #[error("Invalid output filename: {0:?}")]
    InvalidFilename(String),

    #[error("PLY error: {0}")]
    Ply(#[from] PlyError),
}
