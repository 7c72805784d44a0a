//! # Umbra
//!
//! Two-pass shadow mapping: a depth pass renders the scene from a light's
//! perspective frustum into an off-screen depth texture, then a shaded pass
//! renders it from an orbiting camera, darkening fragments the light cannot
//! see.
//!
//! - [`scene::Frustum`]: perspective or orthographic viewing volume with
//!   `orient` and `enclose`
//! - [`renderer::ShadowRenderer`]: the per-frame pass orchestration
//! - [`scene::SceneDrawList`]: meshes, model matrices and materials
//!
//! Rendering goes through [`renderer::RenderBackend`]; the crate ships a
//! wgpu backend for the window and a software backend for headless use.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod app;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod utils;

pub use app::App;
pub use errors::{Result, UmbraError};
pub use renderer::{
    FrameOutcome, FrameStats, RenderBackend, SHADOW_BIAS, ShadowRenderer, SoftwareBackend,
    WgpuBackend,
};
pub use resources::{MeshData, PhongMaterial};
pub use scene::{Frustum, Orthographic, Perspective, SceneDrawList, build_default_scene};
pub use settings::{RenderSettings, SceneSettings, Settings};
pub use utils::{FrameClock, OrbitCamera};
