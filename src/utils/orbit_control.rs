use std::f32::consts::{FRAC_PI_4, TAU};

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::scene::frustum::{Frustum, Perspective};

/// A camera that circles the origin at a fixed height.
///
/// The position is `(radius * cos(angle), height, radius * sin(angle))`,
/// always looking at `center` with `+Y` up. The angle advances at
/// `angular_speed` radians per second and wraps into `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    pub angular_speed: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
    angle: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 11.5,
            height: 7.0,
            angular_speed: 0.2,
            fovy: 50.0,
            near: 0.1,
            far: 100.0,
            angle: FRAC_PI_4,
        }
    }
}

impl OrbitCamera {
    /// Same parameters as the default, starting at `angle` (radians).
    #[must_use]
    pub fn with_angle(angle: f32) -> Self {
        Self {
            angle: angle.rem_euclid(TAU),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle.rem_euclid(TAU);
    }

    /// Advances the orbit by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.angle = (self.angle + self.angular_speed * dt).rem_euclid(TAU);
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        let (sin, cos) = self.angle.sin_cos();
        self.center + Vec3::new(self.radius * cos, self.height, self.radius * sin)
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.center, Vec3::Y)
    }

    /// The camera as a frustum, for the given viewport aspect ratio.
    pub fn frustum(&self, aspect: f32) -> Result<Frustum<Perspective>> {
        let mut frustum = Frustum::new(Perspective::new(self.fovy, aspect, self.near, self.far)?);
        frustum.orient(self.position(), self.center, Vec3::Y)?;
        Ok(frustum)
    }
}
