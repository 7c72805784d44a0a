use glam::Vec3;

use crate::resources::mesh::MeshData;

/// (normal, tangent) per face; bitangent = normal x tangent keeps CCW order.
const FACES: [(Vec3, Vec3); 6] = [
    (Vec3::Z, Vec3::X),
    (Vec3::NEG_Z, Vec3::NEG_X),
    (Vec3::Y, Vec3::X),
    (Vec3::NEG_Y, Vec3::X),
    (Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_X, Vec3::Z),
];

/// Axis-aligned box centred on the origin.
///
/// Four vertices per face so that every face keeps a flat normal.
#[must_use]
pub fn create_box(width: f32, height: f32, depth: f32) -> MeshData {
    let half = Vec3::new(width, height, depth) * 0.5;

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, tangent)) in FACES.iter().enumerate() {
        let bitangent = normal.cross(*tangent);
        let base = face as u32 * 4;

        for (s, t) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (*normal + *tangent * s + bitangent * t) * half;
            positions.push(p.to_array());
            normals.push(normal.to_array());
        }

        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new("box", positions, normals, indices)
}
