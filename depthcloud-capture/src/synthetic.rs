//! Deterministic in-memory depth camera.
//!
//! Produces a fronto-parallel plane at a fixed raw depth with a color
//! gradient. Failures and depth holes can be injected to exercise callers.

use crate::align::align_depth_to_color;
use crate::intrinsics::{Extrinsics, Intrinsics};
use crate::source::{
    CaptureError, ColorFrame, DepthFrame, DepthImage, DeviceError, FramePair, FrameSource,
    StreamConfig,
};
use image::{Luma, Rgb, RgbImage};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Synthetic frame source.
pub struct SyntheticSource {
    config: StreamConfig,
    color_intrinsics: Intrinsics,
    depth_intrinsics: Intrinsics,
    extrinsics: Extrinsics,
    raw_depth: u16,
    depth_scale: f32,
    hole_stride: Option<u32>,
    pending_failures: u32,
    start_time: Instant,
    frame_count: u64,
    active: bool,
}

impl SyntheticSource {
    /// Open a synthetic camera. Zero-sized streams are rejected like a real device would.
    pub fn open(config: StreamConfig) -> Result<Self, DeviceError> {
        if config.width == 0 || config.height == 0 {
            return Err(DeviceError::Unsupported(format!(
                "{}x{} stream",
                config.width, config.height
            )));
        }

        let intrinsics = Intrinsics::new(
            config.width,
            config.height,
            600.0,
            600.0,
            config.width as f32 / 2.0,
            config.height as f32 / 2.0,
        );
        info!(
            "Opening synthetic camera at {}x{} (depth {} fps, color {} fps)",
            config.width, config.height, config.depth_fps, config.color_fps
        );

        Ok(Self {
            config,
            color_intrinsics: intrinsics,
            depth_intrinsics: intrinsics,
            extrinsics: Extrinsics::IDENTITY,
            raw_depth: 1000,
            depth_scale: 0.001,
            hole_stride: None,
            pending_failures: 0,
            start_time: Instant::now(),
            frame_count: 0,
            active: true,
        })
    }

    /// Set the raw depth of the plane and the meters-per-unit scale.
    pub fn with_depth(mut self, raw_depth: u16, depth_scale: f32) -> Self {
        self.raw_depth = raw_depth;
        self.depth_scale = depth_scale;
        self
    }

    /// Use the same intrinsics for the color and depth streams.
    pub fn with_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.color_intrinsics = intrinsics;
        self.depth_intrinsics = intrinsics;
        self
    }

    /// Offset the depth sensor from the color sensor; frames are re-aligned on every pull.
    pub fn with_depth_extrinsics(mut self, extrinsics: Extrinsics) -> Self {
        self.extrinsics = extrinsics;
        self
    }

    /// Make the next `count` pulls fail with a timeout.
    pub fn with_failures(mut self, count: u32) -> Self {
        self.pending_failures = count;
        self
    }

    /// Drop the depth of every `stride`-th pixel (row-major).
    pub fn with_holes(mut self, stride: u32) -> Self {
        self.hole_stride = Some(stride.max(1));
        self
    }

    /// Number of frame pairs handed out so far.
    pub fn frames_delivered(&self) -> u64 {
        self.frame_count
    }

    fn render_depth(&self) -> DepthImage {
        let (w, h) = self.depth_intrinsics.dimensions();
        DepthImage::from_fn(w, h, |x, y| match self.hole_stride {
            Some(stride) if (y * w + x) % stride == 0 => Luma([0]),
            _ => Luma([self.raw_depth]),
        })
    }

    fn render_color(&self) -> RgbImage {
        let (w, h) = self.color_intrinsics.dimensions();
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                (x * 255 / w.max(1)) as u8,
                (y * 255 / h.max(1)) as u8,
                128,
            ])
        })
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame_pair(&mut self, timeout: Duration) -> Result<FramePair, CaptureError> {
        if !self.active {
            return Err(CaptureError::Closed);
        }
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(CaptureError::Timeout(timeout));
        }

        let depth = align_depth_to_color(
            &self.render_depth(),
            &self.depth_intrinsics,
            &self.color_intrinsics,
            &self.extrinsics,
            self.depth_scale,
        );
        let color = self.render_color();

        let timestamp = self.start_time.elapsed().as_secs_f64();
        self.frame_count += 1;
        debug!("Synthetic frame {} at {:.3}s", self.frame_count, timestamp);

        Ok(FramePair::new(
            DepthFrame::new(depth, self.depth_scale, timestamp, self.frame_count),
            ColorFrame::new(color, self.color_intrinsics, timestamp, self.frame_count),
        ))
    }

    fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.config.color_fps as f32)
    }

    fn resolution(&self) -> (u32, u32) {
        self.color_intrinsics.dimensions()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        if self.active {
            self.active = false;
            info!("Synthetic capture stopped after {} frames", self.frame_count);
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.close();
    }
}
