//! Core point cloud types.
//!
//! Colors are linear RGB in the 0-1 range. Colors and normals are optional
//! per point; a cloud only writes a property to disk when every point has it.

use glam::Vec3;

/// A single point in a point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Position in the cloud's coordinate frame.
    pub position: Vec3,
    /// RGB color (0-1 range).
    pub color: Option<Vec3>,
    /// Unit surface normal.
    pub normal: Option<Vec3>,
}

impl Point {
    /// Create an uncolored point without a normal.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            color: None,
            normal: None,
        }
    }

    /// Create a colored point.
    pub fn colored(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color: Some(color),
            normal: None,
        }
    }

    /// Attach a normal to this point.
    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// Axis-aligned bounds of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl Bounds {
    /// Compute bounds from positions. An empty iterator yields a unit sphere at the origin.
    pub fn from_positions(positions: impl Iterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let mut count = 0;

        for pos in positions {
            min = min.min(pos);
            max = max.max(pos);
            count += 1;
        }

        if count == 0 {
            return Self {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
                center: Vec3::ZERO,
                radius: 1.0,
            };
        }

        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(0.01);
        Self {
            min,
            max,
            center,
            radius,
        }
    }
}

/// A set of 3D points built from one capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when every point carries a color (false for an empty cloud).
    pub fn has_colors(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.color.is_some())
    }

    /// True when every point carries a normal (false for an empty cloud).
    pub fn has_normals(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.normal.is_some())
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().map(|p| p.position)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_positions(self.positions())
    }
}

impl From<Vec<Point>> for PointCloud {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
