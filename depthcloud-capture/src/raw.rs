//! Raw frame pairs on disk: color PNG, 16-bit depth PNG and a JSON sidecar.

use crate::intrinsics::Intrinsics;
use crate::source::{ColorFrame, DepthFrame, FramePair};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const COLOR_FILE: &str = "frame_color.png";
pub const DEPTH_FILE: &str = "frame_depth.png";
pub const METADATA_FILE: &str = "frame_intrinsics.json";

#[derive(Debug, Error)]
pub enum RawFrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Raw frames disagree: {0}")]
    Mismatch(String),
}

/// What is needed to rebuild a cloud from the two PNGs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub intrinsics: Intrinsics,
    pub depth_scale: f32,
    pub timestamp: f64,
    pub frame_number: u64,
}

/// Locations of one raw frame pair inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFramePaths {
    pub color: PathBuf,
    pub depth: PathBuf,
    pub metadata: PathBuf,
}

impl RawFramePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            color: dir.join(COLOR_FILE),
            depth: dir.join(DEPTH_FILE),
            metadata: dir.join(METADATA_FILE),
        }
    }

    pub fn all_exist(&self) -> bool {
        self.color.is_file() && self.depth.is_file() && self.metadata.is_file()
    }
}

/// Write a frame pair into `dir`, overwriting the previous pair.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn save_raw_pair(dir: &Path, pair: &FramePair, intrinsics: &Intrinsics) -> Result<RawFramePaths, RawFrameError> {
    fs::create_dir_all(dir)?;
    let paths = RawFramePaths::in_dir(dir);

    pair.color.image.save(&paths.color)?;
    info!("Saved color frame to: {}", paths.color.display());

    pair.depth.image.save(&paths.depth)?;
    info!("Saved depth frame to: {}", paths.depth.display());

    let metadata = CaptureMetadata {
        intrinsics: *intrinsics,
        depth_scale: pair.depth.depth_scale,
        timestamp: pair.color.timestamp,
        frame_number: pair.color.frame_number,
    };
    let mut writer = BufWriter::new(File::create(&paths.metadata)?);
    serde_json::to_writer_pretty(&mut writer, &metadata)?;
    writer.flush()?;

    Ok(paths)
}

/// Read back a pair written by [`save_raw_pair`].
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_raw_pair(dir: &Path) -> Result<(FramePair, CaptureMetadata), RawFrameError> {
    let paths = RawFramePaths::in_dir(dir);

    let metadata: CaptureMetadata = serde_json::from_reader(BufReader::new(File::open(&paths.metadata)?))?;
    let color = image::open(&paths.color)?.into_rgb8();
    let depth = image::open(&paths.depth)?.into_luma16();

    if color.dimensions() != depth.dimensions() {
        return Err(RawFrameError::Mismatch(format!(
            "color is {:?}, depth is {:?}",
            color.dimensions(),
            depth.dimensions()
        )));
    }
    if color.dimensions() != metadata.intrinsics.dimensions() {
        return Err(RawFrameError::Mismatch(format!(
            "images are {:?}, intrinsics describe {:?}",
            color.dimensions(),
            metadata.intrinsics.dimensions()
        )));
    }

    let pair = FramePair::new(
        DepthFrame::new(depth, metadata.depth_scale, metadata.timestamp, metadata.frame_number),
        ColorFrame::new(color, metadata.intrinsics, metadata.timestamp, metadata.frame_number),
    );
    Ok((pair, metadata))
}
