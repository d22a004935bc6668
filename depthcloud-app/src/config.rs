//! Project layout and capture configuration.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use depthcloud_capture::StreamConfig;
use depthcloud_recon::BuildOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default point cloud file name.
pub const DEFAULT_FILENAME: &str = "o3d.ply";

/// Environment variable overriding the project root.
pub const ROOT_ENV: &str = "DEPTHCLOUD_ROOT";

/// Where artifacts live relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `data/raw`: captured color/depth images and their intrinsics.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("data").join("raw")
    }

    /// `data/processed/pointcloud`: PLY output.
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("data").join("processed").join("pointcloud")
    }

    pub fn cloud_path(&self, filename: &str) -> PathBuf {
        self.processed_dir().join(filename)
    }

    /// Create both data directories if they are missing.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.raw_dir())?;
        std::fs::create_dir_all(self.processed_dir())
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Which frame source a capture runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceKind {
    /// Intel RealSense camera (needs the `realsense` feature).
    #[default]
    #[value(name = "realsense")]
    RealSense,
    /// In-memory test scene.
    Synthetic,
    /// The raw frames of the previous capture.
    Replay,
}

/// Everything a capture run needs.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source: SourceKind,
    pub stream: StreamConfig,
    pub layout: ProjectLayout,
    pub filename: String,
    /// Append a local timestamp to the file stem instead of overwriting.
    pub timestamped: bool,
    /// Capture without a terminal once this many frames were shown.
    pub capture_after: Option<u64>,
    pub frame_timeout: Duration,
    pub build: BuildOptions,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            stream: StreamConfig::default(),
            layout: ProjectLayout::default(),
            filename: DEFAULT_FILENAME.to_string(),
            timestamped: false,
            capture_after: None,
            frame_timeout: Duration::from_millis(5000),
            build: BuildOptions::default(),
        }
    }
}

impl CaptureConfig {
    /// The file name the cloud will be written under, stamped with `now` when
    /// `timestamped` is set.
    pub fn output_filename(&self, now: NaiveDateTime) -> String {
        if self.timestamped {
            timestamped_filename(&self.filename, now)
        } else {
            self.filename.clone()
        }
    }
}

/// `o3d.ply` -> `o3d_20250101_120000.ply`
fn timestamped_filename(filename: &str, now: NaiveDateTime) -> String {
    let path = Path::new(filename);
    let stamp = now.format("%Y%m%d_%H%M%S");
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    }
}
