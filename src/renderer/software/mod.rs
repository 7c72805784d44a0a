//! CPU Reference Backend
//!
//! Runs the same two passes as the GPU backend, entirely in memory: a
//! [`DepthTexture`] for the shadow map, an RGBA8 color image and a depth
//! buffer for the surface. Deterministic, so the test suite and headless
//! snapshots use it.

pub mod depth;
pub mod raster;
pub mod shading;

use std::path::Path;

use glam::Vec3;
use image::{Rgba, RgbaImage};
use slotmap::SlotMap;

use crate::errors::{Result, UmbraError};
use crate::renderer::backend::{
    DrawCommand, FrameStatus, MeshId, PassDescriptor, PassTarget, RenderBackend, ShadingMode,
    SkipReason,
};
use crate::resources::MeshData;
use crate::settings::RenderSettings;

pub use depth::DepthTexture;
use raster::{ClipVertex, RasterState, draw_triangle};
use shading::{SurfaceVarying, encode_gamma, encode_linear, shade};

/// In-memory implementation of [`RenderBackend`].
pub struct SoftwareBackend {
    meshes: SlotMap<MeshId, MeshData>,
    shadow_map: DepthTexture,
    color: RgbaImage,
    depth: DepthTexture,
    surface_available: bool,
    in_frame: bool,
    frames_presented: u64,
    /// Targets of the passes run since the last `begin_frame`.
    pass_log: Vec<PassTarget>,
}

impl SoftwareBackend {
    /// Creates the surface and shadow targets.
    pub fn new(width: u32, height: u32, shadow_width: u32, shadow_height: u32) -> Result<Self> {
        if shadow_width == 0 || shadow_height == 0 {
            return Err(UmbraError::ShadowTargetIncomplete(format!(
                "zero-sized depth target {shadow_width}x{shadow_height}"
            )));
        }
        log::info!("Shadow target ready {shadow_width}x{shadow_height} (software)");

        Ok(Self {
            meshes: SlotMap::with_key(),
            shadow_map: DepthTexture::new(shadow_width, shadow_height),
            color: RgbaImage::new(width, height),
            depth: DepthTexture::new(width, height),
            surface_available: true,
            in_frame: false,
            frames_presented: 0,
            pass_log: Vec::new(),
        })
    }

    pub fn from_settings(settings: &RenderSettings) -> Result<Self> {
        let [width, height] = settings.window_size;
        let [shadow_width, shadow_height] = settings.shadow_map_size;
        Self::new(width, height, shadow_width, shadow_height)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn shadow_map(&self) -> &DepthTexture {
        &self.shadow_map
    }

    #[must_use]
    pub fn color_target(&self) -> &RgbaImage {
        &self.color
    }

    #[must_use]
    pub fn depth_buffer(&self) -> &DepthTexture {
        &self.depth
    }

    #[must_use]
    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id)
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[must_use]
    pub fn pass_log(&self) -> &[PassTarget] {
        &self.pass_log
    }

    /// Makes `begin_frame` report the surface as unavailable, like a lost
    /// swapchain would.
    pub fn set_surface_available(&mut self, available: bool) {
        self.surface_available = available;
    }

    /// Writes the last presented color target as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.color.save(path)?;
        log::info!(
            "Wrote {}x{} snapshot to {}",
            self.color.width(),
            self.color.height(),
            path.display()
        );
        Ok(())
    }

    // ========================================================================
    // Passes
    // ========================================================================

    fn lookup(meshes: &SlotMap<MeshId, MeshData>, id: MeshId) -> Result<&MeshData> {
        meshes
            .get(id)
            .ok_or_else(|| UmbraError::UnknownMesh(format!("{id:?}")))
    }

    fn raster_state(pass: &PassDescriptor, width: u32, height: u32) -> RasterState {
        RasterState {
            viewport: pass.viewport,
            target_width: width,
            target_height: height,
            cull: pass.cull,
            depth_bias: pass.depth_bias,
        }
    }

    fn record_depth(
        meshes: &SlotMap<MeshId, MeshData>,
        target: &mut DepthTexture,
        pass: &PassDescriptor,
        draws: &[DrawCommand],
    ) -> Result<()> {
        let state = Self::raster_state(pass, target.width(), target.height());

        for draw in draws {
            let mesh = Self::lookup(meshes, draw.mesh)?;
            for tri in mesh.indices.chunks_exact(3) {
                let vertices = [tri[0], tri[1], tri[2]].map(|i| ClipVertex {
                    clip: draw.uniforms.mvp * Vec3::from(mesh.positions[i as usize]).extend(1.0),
                    varying: (),
                });
                draw_triangle(&state, vertices, |frag| {
                    target.test_and_set(frag.x, frag.y, frag.depth);
                });
            }
        }
        Ok(())
    }

    fn shade_surface(
        meshes: &SlotMap<MeshId, MeshData>,
        shadow_map: &DepthTexture,
        color: &mut RgbaImage,
        depth: &mut DepthTexture,
        pass: &PassDescriptor,
        draws: &[DrawCommand],
    ) -> Result<()> {
        let state = Self::raster_state(pass, color.width(), color.height());

        for draw in draws {
            let mesh = Self::lookup(meshes, draw.mesh)?;
            let u = &draw.uniforms;

            for tri in mesh.indices.chunks_exact(3) {
                let vertices = [tri[0], tri[1], tri[2]].map(|i| {
                    let p = Vec3::from(mesh.positions[i as usize]).extend(1.0);
                    let n = Vec3::from(mesh.normals[i as usize]).extend(0.0);
                    ClipVertex {
                        clip: u.mvp * p,
                        varying: SurfaceVarying {
                            position: (u.model_view * p).truncate(),
                            normal: (u.normal_matrix * n).truncate(),
                            shadow_coord: u.shadow_matrix * p,
                        },
                    }
                });

                draw_triangle(&state, vertices, |frag| {
                    if !depth.test_and_set(frag.x, frag.y, frag.depth) {
                        return;
                    }
                    let v = &frag.varying;
                    let visibility = shadow_map.sample_compare_proj(v.shadow_coord);
                    let rgb = shade(v, frag.front_facing, u, visibility);
                    color.put_pixel(frag.x, frag.y, Rgba(encode_gamma(rgb)));
                });
            }
        }
        Ok(())
    }
}

impl RenderBackend for SoftwareBackend {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        mesh.validate()?;
        let id = self.meshes.insert(mesh.clone());
        log::debug!(
            "Uploaded mesh '{}': {} vertices, {} faces",
            mesh.name,
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(id)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.surface_size() {
            return;
        }
        self.color = RgbaImage::new(width, height);
        self.depth = DepthTexture::new(width, height);
        log::debug!("Software surface resized to {width}x{height}");
    }

    fn surface_size(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    fn shadow_map_size(&self) -> (u32, u32) {
        (self.shadow_map.width(), self.shadow_map.height())
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        if !self.surface_available {
            return Ok(FrameStatus::NotReady(SkipReason::SurfaceUnavailable));
        }
        let (width, height) = self.surface_size();
        if width == 0 || height == 0 {
            return Ok(FrameStatus::NotReady(SkipReason::NotVisible));
        }
        self.in_frame = true;
        self.pass_log.clear();
        Ok(FrameStatus::Ready)
    }

    fn execute_pass(&mut self, pass: &PassDescriptor, draws: &[DrawCommand]) -> Result<()> {
        if !self.in_frame {
            return Err(UmbraError::InvalidPass {
                label: pass.label,
                reason: "no frame in progress".into(),
            });
        }
        log::debug!("{}: {} draws", pass.label, draws.len());

        match (pass.target, pass.shading) {
            (PassTarget::ShadowMap, ShadingMode::RecordDepth) => {
                if let Some(d) = pass.clear_depth {
                    self.shadow_map.clear(d);
                }
                Self::record_depth(&self.meshes, &mut self.shadow_map, pass, draws)?;
            }
            (PassTarget::Surface, ShadingMode::ShadeWithShadow) => {
                if let Some(c) = pass.clear_color {
                    let px = Rgba(encode_linear(c));
                    self.color.pixels_mut().for_each(|p| *p = px);
                }
                if let Some(d) = pass.clear_depth {
                    self.depth.clear(d);
                }
                Self::shade_surface(
                    &self.meshes,
                    &self.shadow_map,
                    &mut self.color,
                    &mut self.depth,
                    pass,
                    draws,
                )?;
            }
            _ => {
                return Err(UmbraError::InvalidPass {
                    label: pass.label,
                    reason: "shading mode does not match the target".into(),
                });
            }
        }

        self.pass_log.push(pass.target);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if self.in_frame {
            self.in_frame = false;
            self.frames_presented += 1;
        } else {
            log::warn!("end_frame without begin_frame");
        }
        Ok(())
    }
}
