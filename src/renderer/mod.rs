//! Rendering
//!
//! - [`backend`]: the [`RenderBackend`] seam and the pass/draw vocabulary
//! - [`shadow`]: [`ShadowRenderer`], which drives a backend through the
//!   depth pass and the shaded pass every frame
//! - [`gpu`]: wgpu implementation presenting to a window
//! - [`software`]: CPU rasterizer with the same semantics, for tests and
//!   headless snapshots

pub mod backend;
pub mod gpu;
pub mod shadow;
pub mod software;

pub use backend::{
    CullMode, DepthBias, DrawCommand, FrameStatus, MeshId, ObjectUniforms, PassDescriptor,
    PassTarget, RenderBackend, ShadingMode, SkipReason, Viewport,
};
pub use gpu::WgpuBackend;
pub use shadow::{FrameOutcome, FrameStats, SHADOW_BIAS, SHADOW_DEPTH_BIAS, ShadowRenderer};
pub use software::SoftwareBackend;
