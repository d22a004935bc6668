//! Common frame source types and traits.

use crate::intrinsics::Intrinsics;
use image::{ImageBuffer, Luma, RgbImage};
use std::time::Duration;
use thiserror::Error;

/// Raw 16-bit depth samples, one per pixel. Zero means "no depth".
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors raised while opening a source. These are fatal: nothing retries them.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Unsupported stream configuration: {0}")]
    Unsupported(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),
}

/// Errors raised by a single frame pull. Callers skip the pull and try again.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No frame pair within {0:?}")]
    Timeout(Duration),

    #[error("Frame set is missing its {0} frame")]
    MissingFrame(&'static str),

    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Source is closed")]
    Closed,
}

/// Requested stream layout. Depth and color share one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub depth_fps: u32,
    pub color_fps: u32,
}

impl StreamConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            depth_fps: 6,
            color_fps: 30,
        }
    }
}

/// A depth frame in the color camera's pixel grid.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub image: DepthImage,
    /// Meters per raw depth unit.
    pub depth_scale: f32,
    /// Timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    pub frame_number: u64,
}

impl DepthFrame {
    pub fn new(image: DepthImage, depth_scale: f32, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            depth_scale,
            timestamp,
            frame_number,
        }
    }

    /// Get image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Depth at a pixel in meters, 0.0 where the sensor reported nothing.
    pub fn meters_at(&self, x: u32, y: u32) -> f32 {
        self.image.get_pixel(x, y).0[0] as f32 * self.depth_scale
    }

    /// Number of pixels carrying a depth sample.
    pub fn valid_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != 0).count()
    }
}

/// An RGB color frame together with its stream's intrinsics.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub image: RgbImage,
    pub intrinsics: Intrinsics,
    /// Timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    pub frame_number: u64,
}

impl ColorFrame {
    pub fn new(image: RgbImage, intrinsics: Intrinsics, timestamp: f64, frame_number: u64) -> Self {
        Self {
            image,
            intrinsics,
            timestamp,
            frame_number,
        }
    }

    /// Get image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Depth and color captured at the same instant on the same pixel grid.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub depth: DepthFrame,
    pub color: ColorFrame,
}

impl FramePair {
    pub fn new(depth: DepthFrame, color: ColorFrame) -> Self {
        Self { depth, color }
    }
}

/// A live source of aligned depth + color frame pairs.
///
/// Implementations own their device exclusively and release it in `close`,
/// which must tolerate being called more than once. Implementations also
/// close from `Drop`, so a source released by scope is always closed.
pub trait FrameSource {
    /// Block for the next frame pair, for at most `timeout`.
    ///
    /// A failure here is transient: the caller should skip it and pull again.
    fn next_frame_pair(&mut self, timeout: Duration) -> Result<FramePair, CaptureError>;

    /// Meters per raw depth unit. Fixed while the source is open.
    fn depth_scale(&self) -> f32;

    /// Intrinsics of the stream that produced `color`.
    fn intrinsics_of(&self, color: &ColorFrame) -> Intrinsics {
        color.intrinsics
    }

    /// Get the color frame rate, if known.
    fn frame_rate(&self) -> Option<f32>;

    /// Get the resolution (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Check if the source is still open.
    fn is_active(&self) -> bool;

    /// Stop streaming and release the device.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame_pair(&mut self, timeout: Duration) -> Result<FramePair, CaptureError> {
        (**self).next_frame_pair(timeout)
    }

    fn depth_scale(&self) -> f32 {
        (**self).depth_scale()
    }

    fn intrinsics_of(&self, color: &ColorFrame) -> Intrinsics {
        (**self).intrinsics_of(color)
    }

    fn frame_rate(&self) -> Option<f32> {
        (**self).frame_rate()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_defaults() {
        let config = StreamConfig::new(1280, 720);
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.depth_fps, 6);
        assert_eq!(config.color_fps, 30);
    }

    #[test]
    fn test_depth_frame_meters() {
        let mut image = DepthImage::new(2, 1);
        image.put_pixel(1, 0, Luma([1500]));
        let frame = DepthFrame::new(image, 0.001, 0.0, 1);

        assert_eq!(frame.meters_at(0, 0), 0.0);
        assert!((frame.meters_at(1, 0) - 1.5).abs() < 1e-6);
        assert_eq!(frame.valid_pixels(), 1);
    }
}
