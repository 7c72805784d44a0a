use std::f32::consts::{PI, TAU};

use crate::resources::mesh::MeshData;

#[derive(Debug, Clone, Copy)]
pub struct SphereOptions {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 32,
            height_segments: 16,
        }
    }
}

/// UV sphere around the origin, poles on the Y axis.
#[must_use]
pub fn create_sphere(options: SphereOptions) -> MeshData {
    let radius = options.radius;
    let width_segments = options.width_segments.max(3);
    let height_segments = options.height_segments.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=height_segments {
        // North pole to south pole
        let theta = i as f32 / height_segments as f32 * PI;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for j in 0..=width_segments {
            let phi = j as f32 / width_segments as f32 * TAU;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let n = [sin_theta * sin_phi, cos_theta, sin_theta * cos_phi];
            positions.push([n[0] * radius, n[1] * radius, n[2] * radius]);
            normals.push(n);
        }
    }

    // The pole rows produce degenerate triangles; rasterizers drop them.
    let stride = width_segments + 1;
    for i in 0..height_segments {
        for j in 0..width_segments {
            let a = i * stride + j;
            let b = (i + 1) * stride + j;
            let c = b + 1;
            let d = a + 1;

            indices.extend_from_slice(&[a, b, c]);
            indices.extend_from_slice(&[a, c, d]);
        }
    }

    MeshData::new("sphere", positions, normals, indices)
}
