//! Scene description
//!
//! - [`Frustum`]: viewing volumes for the light and the camera
//! - [`SceneDrawList`]: the flat list of objects drawn in both passes

pub mod draw_list;
pub mod frustum;

pub use draw_list::{Drawable, SceneDrawList, build_default_scene};
pub use frustum::{Frustum, FrustumError, Orthographic, Perspective, Projection};
