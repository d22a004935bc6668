//! The point cloud build pipeline.

use crate::engine::{PinholeEngine, ReconstructionEngine};
use crate::error::ReconstructionError;
use crate::rgbd::{RgbdImage, RgbdOptions};
use depthcloud_capture::{ColorFrame, DepthFrame, Intrinsics};
use depthcloud_data::{PlyEncoding, PointCloud, axis_flip, save_ply};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Knobs of a single build.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildOptions {
    pub rgbd: RgbdOptions,
    /// Accept a cloud without points instead of failing with `EmptyCloud`.
    pub allow_empty: bool,
    pub encoding: PlyEncoding,
}

/// Converts one aligned frame pair into a point cloud and writes it as PLY.
///
/// Steps, in order: RGB-D fusion, back-projection, axis flip into the
/// viewer's convention, normal estimation, atomic save.
#[derive(Debug, Clone)]
pub struct PointCloudBuilder<E: ReconstructionEngine = PinholeEngine> {
    engine: E,
    options: BuildOptions,
    output_dir: PathBuf,
}

impl PointCloudBuilder<PinholeEngine> {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine: PinholeEngine::default(),
            options: BuildOptions::default(),
            output_dir: output_dir.into(),
        }
    }
}

impl<E: ReconstructionEngine> PointCloudBuilder<E> {
    /// Swap the geometry engine.
    pub fn with_engine<F: ReconstructionEngine>(self, engine: F) -> PointCloudBuilder<F> {
        PointCloudBuilder {
            engine,
            options: self.options,
            output_dir: self.output_dir,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where `filename` would be written.
    pub fn output_path(&self, filename: &str) -> Result<PathBuf, ReconstructionError> {
        validate_filename(filename)?;
        Ok(self.output_dir.join(filename))
    }

    /// Build a cloud from an aligned frame pair. Nothing touches the disk.
    pub fn build(
        &self,
        depth: &DepthFrame,
        color: &ColorFrame,
        intrinsics: &Intrinsics,
    ) -> Result<PointCloud, ReconstructionError> {
        if depth.dimensions() != color.dimensions() || intrinsics.dimensions() != color.dimensions() {
            return Err(ReconstructionError::DimensionMismatch {
                color: color.dimensions(),
                depth: depth.dimensions(),
                intrinsics: intrinsics.dimensions(),
            });
        }

        let rgbd = RgbdImage::from_frames(color, depth, &self.options.rgbd)?;
        let mut cloud = self.engine.create_from_rgbd(&rgbd, intrinsics);
        debug!(
            "Back-projected {} points from {}x{} frame #{}",
            cloud.len(),
            intrinsics.width,
            intrinsics.height,
            depth.frame_number
        );

        if cloud.is_empty() && !self.options.allow_empty {
            return Err(ReconstructionError::EmptyCloud);
        }

        cloud.transform(&axis_flip());
        self.engine.estimate_normals(&mut cloud);

        Ok(cloud)
    }

    /// Write `cloud` to `<output_dir>/<filename>`, replacing any existing file.
    pub fn save(&self, cloud: &PointCloud, filename: &str) -> Result<PathBuf, ReconstructionError> {
        let path = self.output_path(filename)?;
        save_ply(&path, cloud, self.options.encoding)?;
        Ok(path)
    }

    /// [`build`](Self::build) then [`save`](Self::save). Returns the written path and the cloud.
    pub fn build_and_save(
        &self,
        depth: &DepthFrame,
        color: &ColorFrame,
        intrinsics: &Intrinsics,
        filename: &str,
    ) -> Result<(PathBuf, PointCloud), ReconstructionError> {
        // Reject a bad name before spending time on the build.
        validate_filename(filename)?;
        let cloud = self.build(depth, color, intrinsics)?;
        let path = self.save(&cloud, filename)?;
        info!("Point cloud has {} points", cloud.len());
        Ok((path, cloud))
    }
}

/// A plain file name: no separators, not empty, not `.` or `..`.
fn validate_filename(filename: &str) -> Result<(), ReconstructionError> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\']);
    if bad {
        return Err(ReconstructionError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normals::NormalEstimation;
    use depthcloud_capture::{DepthImage, FrameSource, StreamConfig, SyntheticSource};
    use depthcloud_data::{Point, load_ply};
    use glam::Vec3;
    use image::{Luma, Rgb, RgbImage};
    use std::cell::Cell;
    use std::time::Duration;

    fn small_pair(w: u32, h: u32, raw: u16) -> (DepthFrame, ColorFrame, Intrinsics) {
        let intrinsics = Intrinsics::new(w, h, 10.0, 10.0, w as f32 / 2.0, h as f32 / 2.0);
        let depth = DepthFrame::new(DepthImage::from_pixel(w, h, Luma([raw])), 0.001, 0.0, 1);
        let color = ColorFrame::new(RgbImage::from_pixel(w, h, Rgb([0, 255, 0])), intrinsics, 0.0, 1);
        (depth, color, intrinsics)
    }

    fn fast_builder(dir: &Path) -> PointCloudBuilder {
        PointCloudBuilder::new(dir).with_engine(PinholeEngine::new(NormalEstimation::with_knn(8)))
    }

    #[test]
    fn test_synthetic_plane_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SyntheticSource::open(StreamConfig::new(640, 480)).unwrap();
        let pair = source.next_frame_pair(Duration::from_millis(100)).unwrap();
        let intrinsics = source.intrinsics_of(&pair.color);
        source.close();

        let builder = PointCloudBuilder::new(dir.path());
        let (path, cloud) = builder
            .build_and_save(&pair.depth, &pair.color, &intrinsics, "o3d.ply")
            .unwrap();

        assert_eq!(path, dir.path().join("o3d.ply"));
        assert_eq!(cloud.len(), 640 * 480);
        assert!(cloud.has_colors());
        assert!(cloud.has_normals());
        for p in &cloud.points {
            assert!((p.position.z + 1.0).abs() < 1e-6, "z = {}", p.position.z);
        }

        let loaded = load_ply(&path).unwrap();
        assert_eq!(loaded.len(), cloud.len());
    }

    #[test]
    fn test_axis_flip_applied() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, intrinsics) = small_pair(4, 4, 2000);
        let cloud = fast_builder(dir.path()).build(&depth, &color, &intrinsics).unwrap();

        // pixel (0, 0) is up-left of the principal point: y flips to positive
        let first = cloud.points[0].position;
        assert!((first - Vec3::new(-0.4, 0.4, -2.0)).length() < 1e-6, "{first:?}");
        // normals face the sensor, which now looks down -Z
        assert!(cloud.points.iter().all(|p| p.normal.unwrap().z > 0.99));
    }

    #[test]
    fn test_point_count_matches_valid_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SyntheticSource::open(StreamConfig::new(32, 24)).unwrap().with_holes(3);
        let pair = source.next_frame_pair(Duration::from_millis(100)).unwrap();
        let cloud = fast_builder(dir.path())
            .build(&pair.depth, &pair.color, &pair.color.intrinsics)
            .unwrap();
        assert_eq!(cloud.len(), pair.depth.valid_pixels());
        assert!(cloud.len() < 32 * 24);
    }

    #[test]
    fn test_build_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SyntheticSource::open(StreamConfig::new(40, 30)).unwrap().with_holes(5);
        let pair = source.next_frame_pair(Duration::from_millis(100)).unwrap();
        let builder = fast_builder(dir.path());

        let a = builder.build(&pair.depth, &pair.color, &pair.color.intrinsics).unwrap();
        let b = builder.build(&pair.depth, &pair.color, &pair.color.intrinsics).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_cloud_rejected_and_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, intrinsics) = small_pair(4, 4, 0);
        let builder = fast_builder(dir.path());

        let result = builder.build_and_save(&depth, &color, &intrinsics, "o3d.ply");
        assert!(matches!(result, Err(ReconstructionError::EmptyCloud)));
        assert!(!dir.path().join("o3d.ply").exists());
    }

    #[test]
    fn test_empty_cloud_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, intrinsics) = small_pair(4, 4, 0);
        let builder = fast_builder(dir.path()).with_options(BuildOptions {
            allow_empty: true,
            ..BuildOptions::default()
        });

        let (path, cloud) = builder.build_and_save(&depth, &color, &intrinsics, "empty.ply").unwrap();
        assert!(cloud.is_empty());
        assert!(load_ply(&path).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, _) = small_pair(4, 4, 1000);
        let wrong = Intrinsics::new(8, 8, 10.0, 10.0, 4.0, 4.0);

        let result = fast_builder(dir.path()).build_and_save(&depth, &color, &wrong, "o3d.ply");
        match result {
            Err(ReconstructionError::DimensionMismatch { intrinsics, .. }) => assert_eq!(intrinsics, (8, 8)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let builder = fast_builder(dir.path());
        let cloud = PointCloud::new(vec![Point::new(Vec3::ZERO)]);

        for name in ["", ".", "..", "a/b.ply", "..\\x.ply"] {
            assert!(matches!(
                builder.save(&cloud, name),
                Err(ReconstructionError::InvalidFilename(_))
            ));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let builder = fast_builder(dir.path());
        let one = PointCloud::new(vec![Point::new(Vec3::ONE)]);
        let two = PointCloud::new(vec![Point::new(Vec3::ONE), Point::new(Vec3::X)]);

        builder.save(&one, "o3d.ply").unwrap();
        let path = builder.save(&two, "o3d.ply").unwrap();
        assert_eq!(load_ply(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_intensity_option() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, intrinsics) = small_pair(4, 4, 1000);
        let builder = fast_builder(dir.path()).with_options(BuildOptions {
            rgbd: RgbdOptions {
                convert_rgb_to_intensity: true,
                ..RgbdOptions::default()
            },
            ..BuildOptions::default()
        });

        let cloud = builder.build(&depth, &color, &intrinsics).unwrap();
        let c = cloud.points[0].color.unwrap();
        assert!((c.x - 0.587).abs() < 1e-5);
        assert_eq!(c.x, c.z);
    }

    /// Records calls and emits a fixed cloud.
    #[derive(Default)]
    struct RecordingEngine {
        normals_called: Cell<bool>,
    }

    impl ReconstructionEngine for RecordingEngine {
        fn create_from_rgbd(&self, _rgbd: &RgbdImage, _intrinsics: &Intrinsics) -> PointCloud {
            PointCloud::new(vec![Point::new(Vec3::new(1.0, 2.0, 3.0))])
        }

        fn estimate_normals(&self, cloud: &mut PointCloud) {
            // the flip has already happened
            assert_eq!(cloud.points[0].position, Vec3::new(1.0, -2.0, -3.0));
            self.normals_called.set(true);
        }
    }

    #[test]
    fn test_injected_engine_order() {
        let dir = tempfile::tempdir().unwrap();
        let (depth, color, intrinsics) = small_pair(2, 2, 1000);
        let engine = RecordingEngine::default();
        let builder = PointCloudBuilder::new(dir.path()).with_engine(&engine);

        let cloud = builder.build(&depth, &color, &intrinsics).unwrap();
        assert!(engine.normals_called.get());
        assert_eq!(cloud.points[0].position, Vec3::new(1.0, -2.0, -3.0));
    }
}
