//! Rigid transforms applied to whole clouds.

use crate::types::PointCloud;
use glam::{Mat4, Vec4};

/// Flips the Y and Z axes: `diag(1, -1, -1, 1)`.
///
/// Camera frames are X right, Y down, Z forward. Viewers expect Y up and the
/// camera looking down -Z, so every reconstructed cloud goes through this once.
pub fn axis_flip() -> Mat4 {
    Mat4::from_diagonal(Vec4::new(1.0, -1.0, -1.0, 1.0))
}

impl PointCloud {
    /// Apply a rigid transform to every position and normal.
    pub fn transform(&mut self, matrix: &Mat4) {
        for point in &mut self.points {
            point.position = matrix.transform_point3(point.position);
            if let Some(normal) = point.normal {
                point.normal = Some(matrix.transform_vector3(normal).normalize_or_zero());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;
    use glam::Vec3;

    #[test]
    fn test_axis_flip_negates_y_and_z() {
        let mut cloud = PointCloud::new(vec![
            Point::new(Vec3::new(1.0, 2.0, 3.0)).with_normal(Vec3::new(0.0, 0.6, 0.8)),
        ]);
        cloud.transform(&axis_flip());

        assert_eq!(cloud.points[0].position, Vec3::new(1.0, -2.0, -3.0));
        let normal = cloud.points[0].normal.unwrap();
        assert!((normal - Vec3::new(0.0, -0.6, -0.8)).length() < 1e-6);
    }

    #[test]
    fn test_axis_flip_is_an_involution() {
        let original = PointCloud::new(vec![
            Point::new(Vec3::new(0.25, -1.5, 2.0)),
            Point::new(Vec3::new(-3.0, 0.125, -0.5)),
            Point::new(Vec3::ZERO),
        ]);
        let mut cloud = original.clone();
        cloud.transform(&axis_flip());
        cloud.transform(&axis_flip());

        for (a, b) in cloud.points.iter().zip(original.points.iter()) {
            assert!((a.position - b.position).length() < 1e-6);
        }
        assert_eq!(axis_flip() * axis_flip(), Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_keeps_colors() {
        let mut cloud = PointCloud::new(vec![Point::colored(Vec3::X, Vec3::new(0.1, 0.2, 0.3))]);
        cloud.transform(&Mat4::from_translation(Vec3::Y));
        assert_eq!(cloud.points[0].position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(cloud.points[0].color, Some(Vec3::new(0.1, 0.2, 0.3)));
    }
}
