use glam::Vec3;

/// Phong reflectivities of a surface.
///
/// `ka`, `kd` and `ks` scale the light intensity for the ambient, diffuse and
/// specular terms. `shininess` is the specular exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongMaterial {
    pub ka: Vec3,
    pub kd: Vec3,
    pub ks: Vec3,
    pub shininess: f32,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ka: Vec3::splat(0.05),
            kd: Vec3::splat(0.5),
            ks: Vec3::ZERO,
            shininess: 1.0,
        }
    }
}

impl PhongMaterial {
    /// A glossy material: weak ambient tint of `color`, full diffuse, strong
    /// grey specular.
    #[must_use]
    pub fn glossy(color: Vec3) -> Self {
        Self {
            ka: color * 0.05,
            kd: color,
            ks: Vec3::splat(0.9),
            shininess: 150.0,
        }
    }

    /// A dull grey surface without highlights.
    #[must_use]
    pub fn matte() -> Self {
        Self {
            ka: Vec3::splat(0.05),
            kd: Vec3::splat(0.25),
            ks: Vec3::ZERO,
            shininess: 1.0,
        }
    }
}
