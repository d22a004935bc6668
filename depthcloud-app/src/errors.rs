//! Error types for the capture session and the viewer.

use depthcloud_capture::{DeviceError, RawFrameError};
use depthcloud_data::PlyError;
use depthcloud_recon::ReconstructionError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a capture session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Display error: {0}")]
    Display(#[source] std::io::Error),

    #[error("Failed to save raw frames: {0}")]
    Raw(#[from] RawFrameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("Frame source closed before a capture was made")]
    SourceClosed,
}

/// Errors raised while loading or showing a saved point cloud.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Point cloud not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("PLY error: {0}")]
    Ply(#[from] PlyError),

    #[error("Display error: {0}")]
    Display(#[from] std::io::Error),
}
