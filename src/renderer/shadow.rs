//! Two-Pass Shadow Renderer
//!
//! Each frame renders the scene twice:
//!
//! 1. **Depth pass** from the light into the shadow map, with front faces
//!    culled and a polygon offset so lit surfaces do not self-shadow.
//! 2. **Shaded pass** from the orbiting camera into the surface, sampling the
//!    shadow map through each object's shadow matrix
//!    (`SHADOW_BIAS * light_projection * light_view * model`).
//!
//! The depth target is written only in pass 1 and read only in pass 2; the
//! passes are issued in that order and every pass states its full
//! configuration, so nothing leaks from one to the other.

use std::time::Duration;

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::errors::Result;
use crate::renderer::backend::{
    CullMode, DepthBias, DrawCommand, FrameStatus, ObjectUniforms, PassDescriptor, PassTarget,
    RenderBackend, ShadingMode, SkipReason, Viewport,
};
use crate::scene::draw_list::{Drawable, SceneDrawList};
use crate::scene::frustum::{Frustum, Perspective};
use crate::settings::{RenderSettings, SceneSettings};
use crate::utils::{FrameClock, OrbitCamera};

/// Maps clip-space `[-1, 1]` to texture space `[0, 1]` on all three axes.
pub const SHADOW_BIAS: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, 0.5, 0.0, 0.0, //
    0.0, 0.0, 0.5, 0.0, //
    0.5, 0.5, 0.5, 1.0,
]);

/// Polygon offset of the depth pass.
pub const SHADOW_DEPTH_BIAS: DepthBias = DepthBias {
    factor: 1.0,
    units: 1.0,
};

/// What happened to a call of [`ShadowRenderer::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Rendered(FrameStats),
    /// Nothing was drawn and no animation state advanced.
    Skipped(SkipReason),
}

impl FrameOutcome {
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Counters of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Seconds since the previous rendered frame.
    pub dt: f32,
    /// Camera orbit angle used for this frame.
    pub camera_angle: f32,
    pub draw_calls: u32,
    pub triangles: u64,
}

/// Drives a [`RenderBackend`] through the depth and shaded passes.
#[derive(Debug, Clone)]
pub struct ShadowRenderer {
    light: Frustum<Perspective>,
    light_intensity: Vec3,
    /// `SHADOW_BIAS * P * V` of the light.
    light_space: Mat4,
    camera: OrbitCamera,
    clock: FrameClock,
    viewport: Viewport,
    pending_resize: Option<(u32, u32)>,
    visible: bool,
    clear_color: Vec4,
    fit_light_to_camera: bool,
}

impl ShadowRenderer {
    pub fn new(render: &RenderSettings, scene: &SceneSettings) -> Result<Self> {
        let light = scene.light_frustum()?;
        let [width, height] = render.window_size;

        log::info!("Light frustum:\n{light}");

        Ok(Self {
            light_space: SHADOW_BIAS * light.view_projection(),
            light,
            light_intensity: scene.light_intensity(),
            camera: scene.orbit_camera(),
            clock: FrameClock::new(),
            viewport: Viewport::new(width, height),
            pending_resize: None,
            visible: true,
            clear_color: render.clear_color(),
            fit_light_to_camera: scene.fit_light_to_camera,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn light(&self) -> &Frustum<Perspective> {
        &self.light
    }

    /// Replaces the light frustum and recomputes the light-space transform.
    pub fn set_light(&mut self, light: Frustum<Perspective>) {
        self.light_space = SHADOW_BIAS * light.view_projection();
        self.light = light;
    }

    /// World space to shadow-map texture space.
    #[must_use]
    pub fn light_space_transform(&self) -> Mat4 {
        self.light_space
    }

    /// Model space to shadow-map texture space for one object.
    #[must_use]
    pub fn shadow_matrix(&self, model: Mat4) -> Mat4 {
        self.light_space * model
    }

    #[must_use]
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The camera frustum for the current viewport.
    pub fn camera_frustum(&self) -> Result<Frustum<Perspective>> {
        self.camera.frustum(self.viewport.aspect())
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count
    }

    #[must_use]
    pub fn fps(&self) -> f32 {
        self.clock.current_fps
    }

    // ========================================================================
    // Window events
    // ========================================================================

    /// Records a new window size; the viewport and camera aspect follow at
    /// the next rendered frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Resize requested: {width}x{height}");
        self.viewport = Viewport::new(width, height);
        self.pending_resize = Some((width, height));
    }

    /// Marks the window as visible or not (minimized, occluded).
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Renders one frame at `elapsed` time since start.
    ///
    /// Returns [`FrameOutcome::Skipped`] without touching the backend or the
    /// animation when the window is not visible, and without advancing the
    /// animation when the backend has no target this tick.
    pub fn render_frame<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: &SceneDrawList,
        elapsed: Duration,
    ) -> Result<FrameOutcome> {
        if !self.visible || self.viewport.is_empty() {
            log::trace!("Window not visible, skipping frame");
            return Ok(FrameOutcome::Skipped(SkipReason::NotVisible));
        }

        if let Some((width, height)) = self.pending_resize.take() {
            backend.resize(width, height);
        }

        if let FrameStatus::NotReady(reason) = backend.begin_frame()? {
            log::warn!("Frame skipped: {reason:?}");
            return Ok(FrameOutcome::Skipped(reason));
        }

        let dt = self.clock.tick(elapsed);
        self.camera.advance(dt);

        let camera = self.camera_frustum()?;
        if self.fit_light_to_camera {
            self.fit_light(&camera);
        }

        let depth_pass = self.depth_pass(backend.shadow_map_size());
        let depth_draws = self.depth_pass_draws(scene);
        backend.execute_pass(&depth_pass, &depth_draws)?;

        let shaded_draws = self.shaded_pass_draws(scene, &camera);
        backend.execute_pass(&self.shaded_pass(), &shaded_draws)?;

        backend.end_frame()?;

        Ok(FrameOutcome::Rendered(FrameStats {
            frame: self.clock.frame_count,
            dt,
            camera_angle: self.camera.angle(),
            draw_calls: (depth_draws.len() + shaded_draws.len()) as u32,
            triangles: scene.triangle_count() * 2,
        }))
    }

    /// Refits the light's projection around the camera volume. A failed fit
    /// keeps the previous projection.
    fn fit_light(&mut self, camera: &Frustum<Perspective>) {
        let mut light = self.light;
        match light.enclose(camera) {
            Ok(()) => self.set_light(light),
            Err(err) => log::warn!("Light fit failed, keeping previous frustum: {err}"),
        }
    }

    /// Pass 1 state: shadow target, depth clear, and a viewport covering the
    /// backend's whole shadow map of `shadow_size` texels.
    #[must_use]
    pub fn depth_pass(&self, shadow_size: (u32, u32)) -> PassDescriptor {
        PassDescriptor {
            label: "Shadow Depth Pass",
            target: PassTarget::ShadowMap,
            clear_color: None,
            clear_depth: Some(1.0),
            viewport: Viewport::new(shadow_size.0, shadow_size.1),
            shading: ShadingMode::RecordDepth,
            cull: CullMode::Front,
            depth_bias: Some(SHADOW_DEPTH_BIAS),
        }
    }

    /// Pass 2 state: surface target, color and depth clear, window viewport.
    #[must_use]
    pub fn shaded_pass(&self) -> PassDescriptor {
        PassDescriptor {
            label: "Shaded Pass",
            target: PassTarget::Surface,
            clear_color: Some(self.clear_color),
            clear_depth: Some(1.0),
            viewport: self.viewport,
            shading: ShadingMode::ShadeWithShadow,
            cull: CullMode::None,
            depth_bias: None,
        }
    }

    fn depth_pass_draws(&self, scene: &SceneDrawList) -> Vec<DrawCommand> {
        let light_vp = self.light.view_projection();
        scene
            .iter()
            .map(|d| DrawCommand {
                mesh: d.mesh,
                uniforms: ObjectUniforms::depth_only(light_vp * d.model),
            })
            .collect()
    }

    fn shaded_pass_draws(
        &self,
        scene: &SceneDrawList,
        camera: &Frustum<Perspective>,
    ) -> Vec<DrawCommand> {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        let light_position = view * self.light.origin().extend(1.0);

        scene
            .iter()
            .map(|d| DrawCommand {
                mesh: d.mesh,
                uniforms: self.object_uniforms(d, view, projection, light_position),
            })
            .collect()
    }

    fn object_uniforms(
        &self,
        drawable: &Drawable,
        view: Mat4,
        projection: Mat4,
        light_position: Vec4,
    ) -> ObjectUniforms {
        let model_view = view * drawable.model;
        let normal = Mat3::from_mat4(model_view).inverse().transpose();

        ObjectUniforms {
            model_view,
            normal_matrix: Mat4::from_mat3(normal),
            mvp: projection * model_view,
            shadow_matrix: self.shadow_matrix(drawable.model),
            light_position,
            light_intensity: self.light_intensity.extend(1.0),
            ..ObjectUniforms::default()
        }
        .with_material(&drawable.material)
    }
}
