//! Orbit camera for the point cloud viewer.

use depthcloud_data::Bounds;
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Camera pose representing position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Center/focus point that the camera orbits around.
    pub center: Vec3,
    /// Camera position in world space.
    pub position: Vec3,
    /// Yaw angle in radians (rotation around Y axis).
    pub yaw: f32,
    /// Pitch angle in radians (rotation around X axis).
    pub pitch: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, center: Vec3) -> Self {
        let forward = (center - position).normalize_or_zero();
        let yaw = -forward.x.atan2(-forward.z);
        let pitch = forward.y.asin().clamp(-FRAC_PI_2, FRAC_PI_2);
        Self {
            center,
            position,
            yaw,
            pitch,
        }
    }

    /// Orbit around the center point by `delta` radians (yaw, pitch).
    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x;
        self.pitch = (self.pitch - delta.y).clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);

        let dir = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0) * -Vec3::Z;
        let distance = self.distance();
        self.position = self.center - dir.normalize() * distance;
    }

    /// Scale the distance to the center; `factor < 1` moves closer.
    pub fn zoom(&mut self, factor: f32) {
        let direction = (self.position - self.center).normalize_or_zero();
        let distance = (self.distance() * factor).clamp(1e-3, 1e4);
        self.position = self.center + direction * distance;
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.center).length()
    }
}

/// A camera with a home pose it can be reset to.
#[derive(Debug, Clone)]
pub struct Camera {
    pose: CameraPose,
    home: CameraPose,
}

impl Camera {
    pub fn new(position: Vec3, center: Vec3) -> Self {
        let pose = CameraPose::new(position, center);
        Self { pose, home: pose }
    }

    /// Look at the cloud from +Z, the side the sensor saw it from after the
    /// axis flip, far enough back to frame all of it.
    pub fn framing(bounds: &Bounds, fov: f32) -> Self {
        let distance = bounds.radius / (fov * 0.5).tan() * 1.1;
        Self::new(bounds.center + Vec3::Z * distance, bounds.center)
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn pose_mut(&mut self) -> &mut CameraPose {
        &mut self.pose
    }

    pub fn reset(&mut self) {
        self.pose = self.home;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.pose.center - self.pose.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        Mat4::look_to_rh(self.pose.position, forward, up)
    }
}

/// Projection matrix configuration.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    width: u32,
    height: u32,
    fov: f32,
    near: f32,
    far: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fov: f32, near: f32, far: f32) -> Self {
        Self {
            width,
            height,
            fov,
            near,
            far,
        }
    }

    /// Get the projection matrix (depth in 0..1).
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov,
            self.width.max(1) as f32 / self.height.max(1) as f32,
            self.near,
            self.far,
        )
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
