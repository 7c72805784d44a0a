//! CPU-side resources: mesh data, materials and procedural shapes.
//!
//! Nothing here touches the GPU; backends consume [`MeshData`] through
//! [`RenderBackend::upload_mesh`](crate::renderer::RenderBackend::upload_mesh).

pub mod material;
pub mod mesh;
pub mod primitives;

pub use material::PhongMaterial;
pub use mesh::{BoundingBox, MeshData};
