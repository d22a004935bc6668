//! Pinhole camera intrinsics and sensor-to-sensor extrinsics.

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    /// Focal length in pixels along x.
    pub fx: f32,
    /// Focal length in pixels along y.
    pub fy: f32,
    /// Principal point x.
    pub ppx: f32,
    /// Principal point y.
    pub ppy: f32,
}

impl Intrinsics {
    pub fn new(width: u32, height: u32, fx: f32, fy: f32, ppx: f32, ppy: f32) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            ppx,
            ppy,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Back-project pixel `(u, v)` at depth `z` (meters) into camera space.
    pub fn deproject(&self, u: f32, v: f32, z: f32) -> Vec3 {
        Vec3::new((u - self.ppx) * z / self.fx, (v - self.ppy) * z / self.fy, z)
    }

    /// Project a camera-space point onto the image plane.
    pub fn project(&self, point: Vec3) -> Vec2 {
        Vec2::new(
            point.x / point.z * self.fx + self.ppx,
            point.y / point.z * self.fy + self.ppy,
        )
    }
}

/// Rigid transform from one sensor's frame into another's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsics {
    pub rotation: Mat3,
    /// Translation in meters.
    pub translation: Vec3,
}

impl Extrinsics {
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Build from a column-major 3x3 rotation and a translation, the layout SDKs report.
    pub fn from_column_major(rotation: [f32; 9], translation: [f32; 3]) -> Self {
        Self {
            rotation: Mat3::from_cols_array(&rotation),
            translation: Vec3::from_array(translation),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            translation,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_intrinsics() -> Intrinsics {
        Intrinsics::new(640, 480, 600.0, 600.0, 320.0, 240.0)
    }

    #[test]
    fn test_deproject_principal_point() {
        let p = test_intrinsics().deproject(320.0, 240.0, 2.0);
        assert_eq!(p, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_deproject_then_project() {
        let intrinsics = test_intrinsics();
        let p = intrinsics.deproject(100.0, 400.0, 1.5);
        let uv = intrinsics.project(p);
        assert!((uv - Vec2::new(100.0, 400.0)).length() < 1e-3);
    }

    #[test]
    fn test_extrinsics_column_major() {
        // 90 degrees about Z: x -> y
        let e = Extrinsics::from_column_major([0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.5]);
        let p = e.transform_point(Vec3::X);
        assert!((p - Vec3::new(0.0, 1.0, 0.5)).length() < 1e-6);
        assert!(!e.is_identity());
        assert!(Extrinsics::default().is_identity());
    }

    #[test]
    fn test_intrinsics_json() {
        let json = serde_json::to_string(&test_intrinsics()).unwrap();
        let back: Intrinsics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, test_intrinsics());
    }
}
