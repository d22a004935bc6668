//! Geometry engine used by the point cloud builder.

use crate::normals::NormalEstimation;
use crate::rgbd::RgbdImage;
use depthcloud_capture::Intrinsics;
use depthcloud_data::{Point, PointCloud};

/// The geometry operations a [`PointCloudBuilder`](crate::PointCloudBuilder) delegates.
///
/// Swapping the engine lets the build pipeline run against a test double.
pub trait ReconstructionEngine {
    /// Back-project every pixel with depth into a colored point.
    fn create_from_rgbd(&self, rgbd: &RgbdImage, intrinsics: &Intrinsics) -> PointCloud;

    /// Give every point a surface normal.
    fn estimate_normals(&self, cloud: &mut PointCloud);
}

/// CPU pinhole back-projection with k-nearest-neighbour normals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinholeEngine {
    pub normals: NormalEstimation,
}

impl PinholeEngine {
    pub fn new(normals: NormalEstimation) -> Self {
        Self { normals }
    }
}

impl ReconstructionEngine for PinholeEngine {
    fn create_from_rgbd(&self, rgbd: &RgbdImage, intrinsics: &Intrinsics) -> PointCloud {
        let (w, h) = rgbd.dimensions();
        let mut points = Vec::new();

        // Row-major, so identical input always yields identical point order.
        for v in 0..h {
            for u in 0..w {
                let z = rgbd.depth_at(u, v);
                if z <= 0.0 {
                    continue;
                }
                let position = intrinsics.deproject(u as f32, v as f32, z);
                points.push(Point::colored(position, rgbd.color_at(u, v)));
            }
        }

        PointCloud::new(points)
    }

    fn estimate_normals(&self, cloud: &mut PointCloud) {
        self.normals.estimate(cloud);
    }
}

impl<E: ReconstructionEngine + ?Sized> ReconstructionEngine for &E {
    fn create_from_rgbd(&self, rgbd: &RgbdImage, intrinsics: &Intrinsics) -> PointCloud {
        (**self).create_from_rgbd(rgbd, intrinsics)
    }

    fn estimate_normals(&self, cloud: &mut PointCloud) {
        (**self).estimate_normals(cloud)
    }
}
