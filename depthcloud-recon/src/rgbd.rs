//! RGB-D images: color plus metric depth on one pixel grid.

use crate::error::ReconstructionError;
use depthcloud_capture::{ColorFrame, DepthFrame};
use glam::Vec3;
use image::{ImageBuffer, Luma, RgbImage};

/// Depth in meters, 0.0 where there is no sample.
pub type DepthMeters = ImageBuffer<Luma<f32>, Vec<f32>>;

/// How raw frames are turned into an [`RgbdImage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbdOptions {
    /// Depth beyond this many meters is discarded.
    pub depth_trunc: f32,
    /// Replace color with its luma (gray points).
    pub convert_rgb_to_intensity: bool,
}

impl Default for RgbdOptions {
    fn default() -> Self {
        Self {
            depth_trunc: 3.0,
            convert_rgb_to_intensity: false,
        }
    }
}

/// An aligned color image and metric depth image.
#[derive(Debug, Clone)]
pub struct RgbdImage {
    pub color: RgbImage,
    pub depth: DepthMeters,
    pub intensity: bool,
}

impl RgbdImage {
    /// Fuse an aligned frame pair. The depth scale travels with the depth frame.
    pub fn from_frames(
        color: &ColorFrame,
        depth: &DepthFrame,
        options: &RgbdOptions,
    ) -> Result<Self, ReconstructionError> {
        if color.dimensions() != depth.dimensions() {
            return Err(ReconstructionError::DimensionMismatch {
                color: color.dimensions(),
                depth: depth.dimensions(),
                intrinsics: color.intrinsics.dimensions(),
            });
        }

        let scale = depth.depth_scale;
        let trunc = options.depth_trunc;
        let (w, h) = depth.dimensions();
        let meters = DepthMeters::from_fn(w, h, |x, y| {
            let z = depth.image.get_pixel(x, y).0[0] as f32 * scale;
            if z > 0.0 && z <= trunc { Luma([z]) } else { Luma([0.0]) }
        });

        Ok(Self {
            color: color.image.clone(),
            depth: meters,
            intensity: options.convert_rgb_to_intensity,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.depth.dimensions()
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth.get_pixel(x, y).0[0]
    }

    /// Point color (0-1) at a pixel, gray when intensity conversion is on.
    pub fn color_at(&self, x: u32, y: u32) -> Vec3 {
        let [r, g, b] = self.color.get_pixel(x, y).0;
        let rgb = Vec3::new(r as f32, g as f32, b as f32) / 255.0;
        if self.intensity {
            Vec3::splat(rgb.dot(Vec3::new(0.299, 0.587, 0.114)))
        } else {
            rgb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcloud_capture::{DepthImage, Intrinsics};
    use image::Rgb;

    fn frames(raw: &[u16], w: u32, h: u32) -> (ColorFrame, DepthFrame) {
        let intrinsics = Intrinsics::new(w, h, 1.0, 1.0, 0.0, 0.0);
        let depth = DepthImage::from_raw(w, h, raw.to_vec()).unwrap();
        (
            ColorFrame::new(RgbImage::from_pixel(w, h, Rgb([255, 0, 0])), intrinsics, 0.0, 1),
            DepthFrame::new(depth, 0.001, 0.0, 1),
        )
    }

    #[test]
    fn test_depth_is_scaled_and_truncated() {
        let (color, depth) = frames(&[0, 1000, 2999, 3500], 4, 1);
        let rgbd = RgbdImage::from_frames(&color, &depth, &RgbdOptions::default()).unwrap();

        assert_eq!(rgbd.depth_at(0, 0), 0.0);
        assert!((rgbd.depth_at(1, 0) - 1.0).abs() < 1e-6);
        assert!((rgbd.depth_at(2, 0) - 2.999).abs() < 1e-5);
        assert_eq!(rgbd.depth_at(3, 0), 0.0);
    }

    #[test]
    fn test_intensity_conversion() {
        let (color, depth) = frames(&[1000], 1, 1);
        let options = RgbdOptions {
            convert_rgb_to_intensity: true,
            ..RgbdOptions::default()
        };
        let rgbd = RgbdImage::from_frames(&color, &depth, &options).unwrap();
        let c = rgbd.color_at(0, 0);
        assert!((c.x - 0.299).abs() < 1e-5);
        assert_eq!(c.x, c.y);
        assert_eq!(c.y, c.z);
    }

    #[test]
    fn test_size_mismatch() {
        let (_, depth) = frames(&[1000, 1000], 2, 1);
        let color = ColorFrame::new(
            RgbImage::new(1, 1),
            Intrinsics::new(1, 1, 1.0, 1.0, 0.0, 0.0),
            0.0,
            1,
        );
        assert!(matches!(
            RgbdImage::from_frames(&color, &depth, &RgbdOptions::default()),
            Err(ReconstructionError::DimensionMismatch { .. })
        ));
    }
}
