//! Depthcloud capture
//!
//! Streams aligned depth + color frames, and on the capture key saves the raw
//! pair and writes a colored point cloud to `data/processed/pointcloud/`.

use clap::Parser;
use depthcloud_app::{
    CaptureConfig, CaptureOutcome, DEFAULT_FILENAME, LoggingConfig, ProjectLayout, ROOT_ENV,
    SourceKind, run_capture,
};
use depthcloud_capture::StreamConfig;
use depthcloud_recon::{BuildOptions, RgbdOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Depthcloud - capture a depth frame and build a point cloud.
/// The default realsense source needs a build with `--features realsense`;
/// without it pass `--source synthetic` or `--source replay`.
#[derive(Parser, Debug)]
#[command(name = "depthcloud")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Frame source
    #[arg(long, value_enum, default_value_t = SourceKind::RealSense)]
    source: SourceKind,

    /// Stream width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Stream height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Point cloud file name inside data/processed/pointcloud
    #[arg(short, long, default_value = DEFAULT_FILENAME)]
    filename: String,

    /// Add a timestamp to the file name instead of overwriting
    #[arg(long)]
    timestamped: bool,

    /// Capture automatically after this many frames, without a preview
    #[arg(long, value_name = "FRAMES")]
    capture_after: Option<u64>,

    /// How long to wait for each frame pair
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Write the cloud even when no pixel has depth
    #[arg(long)]
    allow_empty: bool,

    /// Gray points from the color luma instead of RGB
    #[arg(long)]
    intensity: bool,

    /// Project root holding the data/ directory
    #[arg(long, env = ROOT_ENV, default_value = ".")]
    root: PathBuf,
}

impl Args {
    fn into_config(self) -> CaptureConfig {
        CaptureConfig {
            source: self.source,
            stream: StreamConfig::new(self.width, self.height),
            layout: ProjectLayout::new(self.root),
            filename: self.filename,
            timestamped: self.timestamped,
            capture_after: self.capture_after,
            frame_timeout: Duration::from_millis(self.timeout_ms),
            build: BuildOptions {
                rgbd: RgbdOptions {
                    convert_rgb_to_intensity: self.intensity,
                    ..RgbdOptions::default()
                },
                allow_empty: self.allow_empty,
                ..BuildOptions::default()
            },
        }
    }
}

fn main() {
    LoggingConfig::default().init();
    let config = Args::parse().into_config();

    match run_capture(&config) {
        Ok(CaptureOutcome::Captured { cloud_path, points, .. }) => {
            info!("Captured {} points into {}", points, cloud_path.display());
        }
        Ok(CaptureOutcome::Interrupted) => {}
        Err(e) => {
            eprintln!("Capture error: {}", e);
            std::process::exit(1);
        }
    }
}
