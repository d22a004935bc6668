//! Replays a raw frame pair saved by an earlier capture.

use crate::raw::{RawFrameError, RawFramePaths, load_raw_pair};
use crate::source::{CaptureError, DeviceError, FramePair, FrameSource};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Frame source that hands out the same saved pair on every pull.
///
/// Saved pairs were aligned when they were captured, so no re-projection
/// happens here.
pub struct ReplaySource {
    pair: FramePair,
    start_time: Instant,
    frame_count: u64,
    active: bool,
}

impl ReplaySource {
    /// Open the raw pair stored in `dir`.
    pub fn open(dir: &Path) -> Result<Self, DeviceError> {
        let paths = RawFramePaths::in_dir(dir);
        if !paths.all_exist() {
            return Err(DeviceError::NotFound(format!(
                "no saved frame pair in {}",
                dir.display()
            )));
        }

        let (pair, metadata) = load_raw_pair(dir).map_err(|e| match e {
            RawFrameError::Mismatch(msg) => DeviceError::Unsupported(msg),
            other => DeviceError::OpenFailed(other.to_string()),
        })?;

        info!(
            "Replaying frame {} from {} ({}x{})",
            metadata.frame_number,
            dir.display(),
            metadata.intrinsics.width,
            metadata.intrinsics.height
        );

        Ok(Self {
            pair,
            start_time: Instant::now(),
            frame_count: 0,
            active: true,
        })
    }
}

impl FrameSource for ReplaySource {
    fn next_frame_pair(&mut self, _timeout: Duration) -> Result<FramePair, CaptureError> {
        if !self.active {
            return Err(CaptureError::Closed);
        }

        let timestamp = self.start_time.elapsed().as_secs_f64();
        self.frame_count += 1;
        debug!("Replayed frame {} at {:.3}s", self.frame_count, timestamp);

        let mut pair = self.pair.clone();
        pair.depth.timestamp = timestamp;
        pair.depth.frame_number = self.frame_count;
        pair.color.timestamp = timestamp;
        pair.color.frame_number = self.frame_count;
        Ok(pair)
    }

    fn depth_scale(&self) -> f32 {
        self.pair.depth.depth_scale
    }

    fn frame_rate(&self) -> Option<f32> {
        None
    }

    fn resolution(&self) -> (u32, u32) {
        self.pair.color.dimensions()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        if self.active {
            self.active = false;
            info!("Replay stopped after {} frames", self.frame_count);
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.close();
    }
}
