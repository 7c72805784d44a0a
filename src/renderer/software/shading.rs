use glam::{Vec3, Vec4};

use super::raster::Varying;
use crate::renderer::backend::ObjectUniforms;

/// Display gamma of the shaded output.
pub const GAMMA: f32 = 2.2;

/// Varyings of the shaded pass, all in view space except the shadow coord.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceVarying {
    pub position: Vec3,
    pub normal: Vec3,
    pub shadow_coord: Vec4,
}

impl Varying for SurfaceVarying {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self {
            position: a.position.lerp(b.position, t),
            normal: a.normal.lerp(b.normal, t),
            shadow_coord: a.shadow_coord.lerp(b.shadow_coord, t),
        }
    }

    fn blend(v: [Self; 3], w: [f32; 3]) -> Self {
        Self {
            position: v[0].position * w[0] + v[1].position * w[1] + v[2].position * w[2],
            normal: v[0].normal * w[0] + v[1].normal * w[1] + v[2].normal * w[2],
            shadow_coord: v[0].shadow_coord * w[0]
                + v[1].shadow_coord * w[1]
                + v[2].shadow_coord * w[2],
        }
    }
}

/// Diffuse plus specular contribution of the light.
#[must_use]
pub fn diffuse_and_specular(v: &SurfaceVarying, front_facing: bool, u: &ObjectUniforms) -> Vec3 {
    let intensity = u.light_intensity();
    let mut n = v.normal.normalize_or_zero();
    if !front_facing {
        n = -n;
    }

    let s = (u.light_position.truncate() - v.position).normalize_or_zero();
    let to_eye = (-v.position).normalize_or_zero();
    let r = (-s).reflect(n);

    let s_dot_n = s.dot(n).max(0.0);
    let diffuse = intensity * u.kd.truncate() * s_dot_n;
    let specular = if s_dot_n > 0.0 {
        intensity * u.ks.truncate() * r.dot(to_eye).max(0.0).powf(u.shininess())
    } else {
        Vec3::ZERO
    };
    diffuse + specular
}

/// Phong color with the light's contribution scaled by `visibility`.
/// Ambient light is never shadowed.
#[must_use]
pub fn shade(v: &SurfaceVarying, front_facing: bool, u: &ObjectUniforms, visibility: f32) -> Vec3 {
    let ambient = u.light_intensity() * u.ka.truncate();
    diffuse_and_specular(v, front_facing, u) * visibility + ambient
}

/// Gamma-encodes a linear color into an 8-bit RGBA pixel.
#[must_use]
pub fn encode_gamma(color: Vec3) -> [u8; 4] {
    let c = color.max(Vec3::ZERO).powf(1.0 / GAMMA).min(Vec3::ONE) * 255.0;
    [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255]
}

/// Stores a linear color as-is (used for clears).
#[must_use]
pub fn encode_linear(color: Vec4) -> [u8; 4] {
    let c = color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
    [
        c.x.round() as u8,
        c.y.round() as u8,
        c.z.round() as u8,
        c.w.round() as u8,
    ]
}
