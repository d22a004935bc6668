//! Intel RealSense capture using realsense-rust.

use crate::align::align_depth_to_color;
use crate::intrinsics::{Extrinsics, Intrinsics};
use crate::source::{
    CaptureError, ColorFrame, DepthFrame, DepthImage, DeviceError, FramePair, FrameSource,
    StreamConfig,
};
use image::{Luma, Rgb, RgbImage};
use realsense_rust::{
    config::Config,
    context::Context,
    frame::{ColorFrame as RsColorFrame, DepthFrame as RsDepthFrame, FrameEx, PixelKind},
    kind::{Rs2CameraInfo, Rs2Extension, Rs2Format, Rs2Option, Rs2StreamKind},
    pipeline::{ActivePipeline, InactivePipeline},
    stream_profile::StreamProfile,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// RealSense depth camera source.
///
/// Streams Z16 depth and RGB8 color at one resolution and re-projects every
/// depth frame into the color camera.
pub struct RealSenseSource {
    pipeline: Option<ActivePipeline>,
    config: StreamConfig,
    depth_scale: f32,
    depth_intrinsics: Intrinsics,
    color_intrinsics: Intrinsics,
    extrinsics: Extrinsics,
    frame_count: u64,
}

fn to_intrinsics(profile: &StreamProfile) -> Result<Intrinsics, DeviceError> {
    let intr = profile
        .intrinsics()
        .map_err(|e| DeviceError::OpenFailed(format!("no intrinsics for {:?}: {e}", profile.kind())))?;
    Ok(Intrinsics::new(
        intr.width() as u32,
        intr.height() as u32,
        intr.fx(),
        intr.fy(),
        intr.ppx(),
        intr.ppy(),
    ))
}

impl RealSenseSource {
    /// Open the first attached RealSense device.
    pub fn open(config: StreamConfig) -> Result<Self, DeviceError> {
        info!(
            "Opening RealSense at {}x{} (depth {} fps, color {} fps)",
            config.width, config.height, config.depth_fps, config.color_fps
        );

        let context = Context::new().map_err(|e| DeviceError::OpenFailed(e.to_string()))?;
        let devices = context.query_devices(HashSet::new());
        let device = devices
            .first()
            .ok_or_else(|| DeviceError::NotFound("no RealSense device attached".to_string()))?;

        if let Some(line) = device.info(Rs2CameraInfo::ProductLine) {
            info!("Device product line: {}", line.to_string_lossy());
        }

        let mut rs_config = Config::new();
        rs_config
            .disable_all_streams()
            .and_then(|c| {
                c.enable_stream(
                    Rs2StreamKind::Depth,
                    None,
                    config.width as usize,
                    config.height as usize,
                    Rs2Format::Z16,
                    config.depth_fps as usize,
                )
            })
            .and_then(|c| {
                c.enable_stream(
                    Rs2StreamKind::Color,
                    None,
                    config.width as usize,
                    config.height as usize,
                    Rs2Format::Rgb8,
                    config.color_fps as usize,
                )
            })
            .map_err(|e| DeviceError::Unsupported(e.to_string()))?;

        let pipeline = InactivePipeline::try_from(&context)
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?
            .start(Some(rs_config))
            .map_err(|e| DeviceError::Unsupported(e.to_string()))?;

        let profile = pipeline.profile();

        let depth_scale = profile
            .device()
            .sensors()
            .iter()
            .find(|s| s.extension() == Rs2Extension::DepthSensor)
            .and_then(|s| s.get_option(Rs2Option::DepthUnits))
            .ok_or_else(|| DeviceError::OpenFailed("device reports no depth units".to_string()))?;

        let find_stream = |kind: Rs2StreamKind| {
            profile
                .streams()
                .iter()
                .find(|s| s.kind() == kind)
                .ok_or_else(|| DeviceError::Unsupported(format!("{kind:?} stream did not start")))
        };
        let depth_profile = find_stream(Rs2StreamKind::Depth)?;
        let color_profile = find_stream(Rs2StreamKind::Color)?;

        let depth_intrinsics = to_intrinsics(depth_profile)?;
        let color_intrinsics = to_intrinsics(color_profile)?;
        let extrinsics = depth_profile
            .extrinsics(color_profile)
            .map(|e| Extrinsics::from_column_major(e.rotation(), e.translation()))
            .map_err(|e| DeviceError::OpenFailed(format!("no depth->color extrinsics: {e}")))?;

        info!(
            "RealSense opened: depth scale {} m/unit, color fx={:.1} fy={:.1}",
            depth_scale, color_intrinsics.fx, color_intrinsics.fy
        );

        Ok(Self {
            pipeline: Some(pipeline),
            config,
            depth_scale,
            depth_intrinsics,
            color_intrinsics,
            extrinsics,
            frame_count: 0,
        })
    }

    fn copy_depth(frame: &RsDepthFrame) -> Result<DepthImage, CaptureError> {
        let (w, h) = (frame.width(), frame.height());
        let mut image = DepthImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                match frame.get(col, row) {
                    Some(PixelKind::Z16 { depth }) => {
                        image.put_pixel(col as u32, row as u32, Luma([*depth]));
                    }
                    _ => return Err(CaptureError::InvalidFrame("depth pixel is not Z16".to_string())),
                }
            }
        }
        Ok(image)
    }

    fn copy_color(frame: &RsColorFrame) -> Result<RgbImage, CaptureError> {
        let (w, h) = (frame.width(), frame.height());
        let mut image = RgbImage::new(w as u32, h as u32);
        for row in 0..h {
            for col in 0..w {
                match frame.get(col, row) {
                    Some(PixelKind::Rgb8 { r, g, b }) => {
                        image.put_pixel(col as u32, row as u32, Rgb([*r, *g, *b]));
                    }
                    _ => return Err(CaptureError::InvalidFrame("color pixel is not RGB8".to_string())),
                }
            }
        }
        Ok(image)
    }
}

impl FrameSource for RealSenseSource {
    fn next_frame_pair(&mut self, timeout: Duration) -> Result<FramePair, CaptureError> {
        let pipeline = self.pipeline.as_mut().ok_or(CaptureError::Closed)?;

        let frames = pipeline.wait(Some(timeout)).map_err(|e| {
            debug!("RealSense wait failed: {e}");
            CaptureError::Timeout(timeout)
        })?;

        let depth_frame = frames
            .frames_of_type::<RsDepthFrame>()
            .pop()
            .ok_or(CaptureError::MissingFrame("depth"))?;
        let color_frame = frames
            .frames_of_type::<RsColorFrame>()
            .pop()
            .ok_or(CaptureError::MissingFrame("color"))?;

        let raw_depth = Self::copy_depth(&depth_frame)?;
        let depth = align_depth_to_color(
            &raw_depth,
            &self.depth_intrinsics,
            &self.color_intrinsics,
            &self.extrinsics,
            self.depth_scale,
        );
        let color = Self::copy_color(&color_frame)?;

        // Device timestamps are in milliseconds.
        let timestamp = color_frame.timestamp() / 1000.0;
        self.frame_count += 1;
        debug!(
            "Captured frame {} (device #{}) at {:.3}s",
            self.frame_count,
            color_frame.frame_number(),
            timestamp
        );

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
        self.pipeline.is_some()
    }

    fn close(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _inactive = pipeline.stop();
            info!("RealSense capture stopped after {} frames", self.frame_count);
        } else {
            debug!("RealSense source already closed");
        }
    }
}

impl Drop for RealSenseSource {
    fn drop(&mut self) {
        if self.pipeline.is_some() {
            self.close();
        }
    }
}
