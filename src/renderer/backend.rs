//! Backend Abstraction
//!
//! A [`RenderBackend`] owns every device resource: uploaded meshes, the
//! off-screen depth target rendered from the light, and the presentable
//! color target. The [`ShadowRenderer`](super::ShadowRenderer) drives it with
//! fully specified passes, so a pass never inherits state (viewport, cull
//! mode, shading mode, bound target) from the one before it.
//!
//! Frame protocol:
//!
//! ```text
//! begin_frame()  -> Ready | NotReady(reason)
//! execute_pass(depth pass)       writes the shadow map
//! execute_pass(shaded pass)      reads the shadow map
//! end_frame()                    presents
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use slotmap::new_key_type;

use crate::errors::Result;
use crate::resources::{MeshData, PhongMaterial};

new_key_type! {
    /// Handle to a mesh uploaded into a backend's arena.
    pub struct MeshId;
}

/// Why a frame was not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The window is minimized, occluded or has zero size.
    NotVisible,
    /// The backend could not provide a target to draw into this tick.
    SurfaceUnavailable,
}

/// Result of [`RenderBackend::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    NotReady(SkipReason),
}

/// Render target of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// The off-screen depth texture seen from the light.
    ShadowMap,
    /// The presentable color + depth target seen from the camera.
    Surface,
}

/// What the fragment stage does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    /// Depth only; no color output.
    RecordDepth,
    /// Phong shading attenuated by the shadow-map comparison.
    ShadeWithShadow,
}

/// Which triangles are discarded, by window-space winding (CCW is front).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Slope-scaled depth offset, in the classic `glPolygonOffset` sense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub factor: f32,
    pub units: f32,
}

/// Pixel rectangle of a pass, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `width / height`, or 1 for an empty viewport.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Complete state of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub label: &'static str,
    pub target: PassTarget,
    /// Color clear value; ignored by depth-only targets.
    pub clear_color: Option<Vec4>,
    pub clear_depth: Option<f32>,
    pub viewport: Viewport,
    pub shading: ShadingMode,
    pub cull: CullMode,
    pub depth_bias: Option<DepthBias>,
}

/// Per-draw shader inputs.
///
/// Matrix conventions are OpenGL's (clip z in `[-w, w]`); backends with a
/// different depth range convert in their vertex stage. `shadow_matrix` maps
/// model space to shadow-map texture space (`xy` and depth in `[0, 1]` after
/// the perspective divide).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model_view: Mat4,
    /// Upper 3x3 is the inverse transpose of `model_view`.
    pub normal_matrix: Mat4,
    pub mvp: Mat4,
    pub shadow_matrix: Mat4,
    /// View-space light position, `w = 1`.
    pub light_position: Vec4,
    pub light_intensity: Vec4,
    pub ka: Vec4,
    pub kd: Vec4,
    /// `w` carries the shininess.
    pub ks: Vec4,
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self {
            model_view: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
            shadow_matrix: Mat4::IDENTITY,
            light_position: Vec4::W,
            light_intensity: Vec4::ONE,
            ka: Vec4::ZERO,
            kd: Vec4::ZERO,
            ks: Vec4::ZERO,
        }
    }
}

impl ObjectUniforms {
    /// Uniforms for the depth pass: only the clip transform matters.
    #[must_use]
    pub fn depth_only(mvp: Mat4) -> Self {
        Self {
            mvp,
            ..Self::default()
        }
    }

    /// Copies a material's reflectivities into the uniform block.
    #[must_use]
    pub fn with_material(mut self, material: &PhongMaterial) -> Self {
        self.ka = material.ka.extend(0.0);
        self.kd = material.kd.extend(0.0);
        self.ks = material.ks.extend(material.shininess);
        self
    }

    #[inline]
    #[must_use]
    pub fn shininess(&self) -> f32 {
        self.ks.w
    }

    #[inline]
    #[must_use]
    pub fn light_intensity(&self) -> Vec3 {
        self.light_intensity.truncate()
    }
}

/// One mesh drawn with one set of uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub mesh: MeshId,
    pub uniforms: ObjectUniforms,
}

/// A device able to run the two-pass shadow frame.
pub trait RenderBackend {
    /// Validates and uploads `mesh`, returning its handle.
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId>;

    /// Recreates size-dependent surface resources.
    fn resize(&mut self, width: u32, height: u32);

    /// Current size of the presentable target.
    fn surface_size(&self) -> (u32, u32);

    /// Size of the off-screen depth target.
    fn shadow_map_size(&self) -> (u32, u32);

    /// Acquires the frame's targets, or reports why this tick cannot render.
    fn begin_frame(&mut self) -> Result<FrameStatus>;

    /// Records and runs one pass.
    fn execute_pass(&mut self, pass: &PassDescriptor, draws: &[DrawCommand]) -> Result<()>;

    /// Finishes the frame and presents it.
    fn end_frame(&mut self) -> Result<()>;
}
