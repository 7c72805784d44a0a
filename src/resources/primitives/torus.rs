use std::f32::consts::TAU;

use crate::resources::mesh::MeshData;

/// Ring around the Z axis.
///
/// `outer_radius` is the distance from the centre to the middle of the tube,
/// `inner_radius` the radius of the tube itself.
#[derive(Debug, Clone, Copy)]
pub struct TorusOptions {
    pub outer_radius: f32,
    pub inner_radius: f32,
    pub sides: u32,
    pub rings: u32,
}

impl Default for TorusOptions {
    fn default() -> Self {
        Self {
            outer_radius: 1.4,
            inner_radius: 0.6,
            sides: 50,
            rings: 50,
        }
    }
}

#[must_use]
pub fn create_torus(options: TorusOptions) -> MeshData {
    let sides = options.sides.max(3);
    let rings = options.rings.max(3);

    let vertex_count = ((sides + 1) * (rings + 1)) as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);
    let mut indices = Vec::with_capacity((sides * rings * 6) as usize);

    for ring in 0..=rings {
        let u = ring as f32 / rings as f32 * TAU;
        let (sin_u, cos_u) = u.sin_cos();

        for side in 0..=sides {
            let v = side as f32 / sides as f32 * TAU;
            let (sin_v, cos_v) = v.sin_cos();

            let r = options.outer_radius + options.inner_radius * cos_v;
            positions.push([r * cos_u, r * sin_u, options.inner_radius * sin_v]);
            normals.push([cos_v * cos_u, cos_v * sin_u, sin_v]);
        }
    }

    let stride = sides + 1;
    for ring in 0..rings {
        for side in 0..sides {
            let a = ring * stride + side;
            let b = (ring + 1) * stride + side;
            let c = b + 1;
            let d = a + 1;

            indices.extend_from_slice(&[a, b, c]);
            indices.extend_from_slice(&[a, c, d]);
        }
    }

    MeshData::new("torus", positions, normals, indices)
}
