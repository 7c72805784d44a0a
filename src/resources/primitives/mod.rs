//! Procedural shapes.
//!
//! Every producer returns a [`MeshData`](crate::resources::MeshData) whose
//! triangles wind counter-clockwise when seen from outside, so front-face
//! culling in the depth pass removes the faces that look at the light.

pub mod box_shape;
pub mod plane;
pub mod sphere;
pub mod torus;

pub use box_shape::create_box;
pub use plane::{PlaneOptions, create_plane};
pub use sphere::{SphereOptions, create_sphere};
pub use torus::{TorusOptions, create_torus};
