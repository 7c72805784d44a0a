//! wgpu Backend
//!
//! Implements [`RenderBackend`] on a window surface. Each pass is encoded and
//! submitted on its own, so the shadow map is fully written before the shaded
//! pass samples it, and per-draw uniforms of one pass never alias those of
//! the other.
//!
//! Pipelines are created lazily and cached by the state a pass asks for
//! (shading mode, cull mode, depth bias).

pub mod context;
pub mod shadow_target;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use slotmap::SlotMap;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::errors::{Result, UmbraError};
use crate::renderer::backend::{
    CullMode, DepthBias, DrawCommand, FrameStatus, MeshId, ObjectUniforms, PassDescriptor,
    PassTarget, RenderBackend, ShadingMode, SkipReason,
};
use crate::resources::MeshData;
use crate::settings::RenderSettings;

pub use context::{DEPTH_FORMAT, WgpuContext};
pub use shadow_target::ShadowTarget;

const SHADER_SOURCE: &str = include_str!("shadow.wgsl");

const UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniforms>() as u64;

const INITIAL_UNIFORM_CAPACITY: u32 = 16;

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Vertex and index buffers of one uploaded mesh.
struct GpuMesh {
    positions: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    shading: ShadingMode,
    cull: CullMode,
    /// `(units, factor bits)`
    depth_bias: Option<(i32, u32)>,
}

impl PipelineKey {
    fn new(pass: &PassDescriptor) -> Self {
        Self {
            shading: pass.shading,
            cull: pass.cull,
            depth_bias: pass
                .depth_bias
                .map(|b: DepthBias| (b.units.round() as i32, b.factor.to_bits())),
        }
    }

    fn bias_state(&self) -> wgpu::DepthBiasState {
        match self.depth_bias {
            Some((units, factor)) => wgpu::DepthBiasState {
                constant: units,
                slope_scale: f32::from_bits(factor),
                clamp: 0.0,
            },
            None => wgpu::DepthBiasState::default(),
        }
    }

    fn cull_face(&self) -> Option<wgpu::Face> {
        match self.cull {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

/// How `begin_frame` reacts to a surface texture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acquire {
    Render { reconfigure_after: bool },
    Skip { reason: SkipReason, reconfigure: bool },
    Fail,
}

impl Acquire {
    fn of(current: &wgpu::CurrentSurfaceTexture) -> Self {
        use wgpu::CurrentSurfaceTexture as Current;
        match current {
            Current::Success(_) => Self::Render {
                reconfigure_after: false,
            },
            Current::Suboptimal(_) => Self::Render {
                reconfigure_after: true,
            },
            Current::Occluded => Self::Skip {
                reason: SkipReason::NotVisible,
                reconfigure: false,
            },
            Current::Timeout => Self::Skip {
                reason: SkipReason::SurfaceUnavailable,
                reconfigure: false,
            },
            Current::Lost | Current::Outdated => Self::Skip {
                reason: SkipReason::SurfaceUnavailable,
                reconfigure: true,
            },
            Current::Validation => Self::Fail,
        }
    }
}

/// The swapchain image of the frame in flight.
struct FrameTarget {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    /// Reconfigure once this texture has been presented.
    suboptimal: bool,
}

/// Dynamic-offset uniform buffer holding one [`ObjectUniforms`] per draw.
struct ObjectBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u32,
    capacity: u32,
}

impl ObjectBuffer {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u32) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment.max(1);
        let stride = align_to(UNIFORM_SIZE as u32, alignment);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniform Buffer"),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_SIZE),
                }),
            }],
        });

        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, n: u32) {
        if n > self.capacity {
            let capacity = n.next_power_of_two();
            log::debug!("Growing object uniforms to {capacity} slots");
            *self = Self::new(device, layout, capacity);
        }
    }

    fn write(&self, queue: &wgpu::Queue, draws: &[DrawCommand]) {
        let stride = self.stride as usize;
        let mut staging = vec![0u8; stride * draws.len()];
        for (slot, draw) in staging.chunks_exact_mut(stride).zip(draws) {
            slot[..UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&draw.uniforms));
        }
        queue.write_buffer(&self.buffer, 0, &staging);
    }
}

/// GPU implementation of [`RenderBackend`].
///
/// Field order is drop order: GPU objects go before the context that owns
/// the device.
pub struct WgpuBackend {
    meshes: SlotMap<MeshId, GpuMesh>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    objects: ObjectBuffer,
    shadow_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    shadow_layout: wgpu::BindGroupLayout,
    shader: wgpu::ShaderModule,
    shadow_target: ShadowTarget,
    frame: Option<FrameTarget>,
    ctx: WgpuContext,
}

impl WgpuBackend {
    /// Sets up device, surface and shadow target for `window`.
    pub fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self> {
        let ctx = pollster::block_on(WgpuContext::new(window, settings))?;
        Self::with_context(ctx, settings)
    }

    pub fn with_context(ctx: WgpuContext, settings: &RenderSettings) -> Result<Self> {
        let [shadow_width, shadow_height] = settings.shadow_map_size;
        let shadow_target = ShadowTarget::new(&ctx, shadow_width, shadow_height)?;
        let device = &ctx.device;

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object BindGroup Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Map BindGroup Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Map BindGroup"),
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_target.sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER_SOURCE)),
        });

        let objects = ObjectBuffer::new(device, &object_layout, INITIAL_UNIFORM_CAPACITY);

        Ok(Self {
            meshes: SlotMap::with_key(),
            pipelines: HashMap::new(),
            objects,
            shadow_bind_group,
            object_layout,
            shadow_layout,
            shader,
            shadow_target,
            frame: None,
            ctx,
        })
    }

    #[must_use]
    pub fn context(&self) -> &WgpuContext {
        &self.ctx
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        let Self {
            pipelines,
            ctx,
            shader,
            object_layout,
            shadow_layout,
            ..
        } = self;

        pipelines.entry(key).or_insert_with(|| {
            log::debug!("Creating pipeline {key:?}");
            Self::create_pipeline(ctx, shader, object_layout, shadow_layout, key)
        });
    }

    fn create_pipeline(
        ctx: &WgpuContext,
        shader: &wgpu::ShaderModule,
        object_layout: &wgpu::BindGroupLayout,
        shadow_layout: &wgpu::BindGroupLayout,
        key: PipelineKey,
    ) -> wgpu::RenderPipeline {
        let device = &ctx.device;

        let position_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };
        let normal_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![1 => Float32x3],
        };

        let vertex_layouts = [position_layout, normal_layout];
        let bind_group_layouts = [Some(object_layout), Some(shadow_layout)];

        // The depth pipeline reads positions only and has no shadow map bound.
        let depth_only = key.shading == ShadingMode::RecordDepth;
        let (label, vs_entry, used) = if depth_only {
            ("Shadow Depth Pipeline", "vs_depth", 1)
        } else {
            ("Shaded Pipeline", "vs_shade", 2)
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts[..used],
            immediate_size: 0,
        });

        let color_targets = [Some(wgpu::ColorTargetState {
            format: ctx.color_format(),
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let fragment = (!depth_only).then(|| wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_shade"),
            targets: &color_targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(vs_entry),
                buffers: &vertex_layouts[..used],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.cull_face(),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::Less),
                stencil: wgpu::StencilState::default(),
                bias: key.bias_state(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn invalid(pass: &PassDescriptor, reason: &str) -> UmbraError {
        UmbraError::InvalidPass {
            label: pass.label,
            reason: reason.to_string(),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        mesh.validate()?;
        let device = &self.ctx.device;

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} positions", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let normals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} normals", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.normals),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} indices", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "Uploaded mesh '{}': {} vertices, {} faces",
            mesh.name,
            mesh.vertex_count(),
            mesh.face_count()
        );

        Ok(self.meshes.insert(GpuMesh {
            positions,
            normals,
            indices,
            index_count: mesh.index_count(),
        }))
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.ctx.size() {
            log::info!("Surface resized to {width}x{height}");
            self.ctx.resize(width, height);
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.ctx.size()
    }

    fn shadow_map_size(&self) -> (u32, u32) {
        (self.shadow_target.width, self.shadow_target.height)
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        let current = self.ctx.surface.get_current_texture();
        let (surface_texture, suboptimal) = match (Acquire::of(&current), current) {
            (
                Acquire::Render { reconfigure_after },
                wgpu::CurrentSurfaceTexture::Success(texture)
                | wgpu::CurrentSurfaceTexture::Suboptimal(texture),
            ) => (texture, reconfigure_after),
            (
                Acquire::Skip {
                    reason,
                    reconfigure,
                },
                _,
            ) => {
                if reconfigure {
                    log::warn!("Surface lost or outdated, reconfiguring");
                    self.ctx.reconfigure();
                }
                return Ok(FrameStatus::NotReady(reason));
            }
            _ => {
                return Err(UmbraError::SurfaceError(
                    "validation error while acquiring the surface texture".to_string(),
                ));
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(FrameTarget {
            surface_texture,
            view,
            suboptimal,
        });
        Ok(FrameStatus::Ready)
    }

    fn execute_pass(&mut self, pass: &PassDescriptor, draws: &[DrawCommand]) -> Result<()> {
        if self.frame.is_none() {
            return Err(Self::invalid(pass, "no frame in progress"));
        }
        match (pass.target, pass.shading) {
            (PassTarget::ShadowMap, ShadingMode::RecordDepth)
            | (PassTarget::Surface, ShadingMode::ShadeWithShadow) => {}
            _ => return Err(Self::invalid(pass, "shading mode does not match the target")),
        }

        let n = draws.len() as u32;
        self.objects
            .ensure_capacity(&self.ctx.device, &self.object_layout, n.max(1));
        self.objects.write(&self.ctx.queue, draws);

        let key = PipelineKey::new(pass);
        self.ensure_pipeline(key);

        // Resolve meshes up front so a bad handle fails before encoding.
        let meshes = draws
            .iter()
            .map(|d| {
                self.meshes
                    .get(d.mesh)
                    .ok_or_else(|| UmbraError::UnknownMesh(format!("{:?}", d.mesh)))
            })
            .collect::<Result<Vec<_>>>()?;

        let pipeline = &self.pipelines[&key];

        let Some(frame) = self.frame.as_ref() else {
            return Err(Self::invalid(pass, "no frame in progress"));
        };

        let depth_ops = Some(wgpu::Operations {
            load: pass
                .clear_depth
                .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(pass.label),
            });

        {
            let color_attachments = [Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: pass.clear_color.map_or(wgpu::LoadOp::Load, |c| {
                        wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(c.x),
                            g: f64::from(c.y),
                            b: f64::from(c.z),
                            a: f64::from(c.w),
                        })
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })];

            let (color_attachments, depth_view): (&[_], _) = match pass.target {
                PassTarget::ShadowMap => (&[], &self.shadow_target.view),
                PassTarget::Surface => (&color_attachments, &self.ctx.depth_texture_view),
            };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops,
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let vp = pass.viewport;
            rpass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );
            rpass.set_pipeline(pipeline);
            if pass.shading == ShadingMode::ShadeWithShadow {
                rpass.set_bind_group(1, &self.shadow_bind_group, &[]);
            }

            for (i, mesh) in meshes.iter().enumerate() {
                let offset = i as u32 * self.objects.stride;
                rpass.set_bind_group(0, &self.objects.bind_group, &[offset]);
                rpass.set_vertex_buffer(0, mesh.positions.slice(..));
                if pass.shading == ShadingMode::ShadeWithShadow {
                    rpass.set_vertex_buffer(1, mesh.normals.slice(..));
                }
                rpass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("{}: {} draws", pass.label, draws.len());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        match self.frame.take() {
            Some(FrameTarget {
                surface_texture,
                view,
                suboptimal,
            }) => {
                drop(view);
                surface_texture.present();
                if suboptimal {
                    log::debug!("Surface suboptimal, reconfiguring");
                    self.ctx.reconfigure();
                }
            }
            None => log::warn!("end_frame without begin_frame"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occluded_surface_skips_as_not_visible() {
        assert_eq!(
            Acquire::of(&wgpu::CurrentSurfaceTexture::Occluded),
            Acquire::Skip {
                reason: SkipReason::NotVisible,
                reconfigure: false,
            }
        );
    }

    #[test]
    fn lost_or_outdated_surface_reconfigures_and_skips() {
        for current in [
            wgpu::CurrentSurfaceTexture::Lost,
            wgpu::CurrentSurfaceTexture::Outdated,
        ] {
            assert_eq!(
                Acquire::of(&current),
                Acquire::Skip {
                    reason: SkipReason::SurfaceUnavailable,
                    reconfigure: true,
                }
            );
        }
    }

    #[test]
    fn timeout_skips_without_reconfigure() {
        assert_eq!(
            Acquire::of(&wgpu::CurrentSurfaceTexture::Timeout),
            Acquire::Skip {
                reason: SkipReason::SurfaceUnavailable,
                reconfigure: false,
            }
        );
    }

    #[test]
    fn validation_failure_is_an_error() {
        assert_eq!(
            Acquire::of(&wgpu::CurrentSurfaceTexture::Validation),
            Acquire::Fail
        );
    }

    #[test]
    fn pipeline_key_keeps_depth_bias() {
        let pass = PassDescriptor {
            label: "depth",
            target: PassTarget::ShadowMap,
            clear_color: None,
            clear_depth: Some(1.0),
            viewport: crate::renderer::backend::Viewport::new(4, 4),
            shading: ShadingMode::RecordDepth,
            cull: CullMode::Front,
            depth_bias: Some(DepthBias {
                factor: 1.0,
                units: 1.0,
            }),
        };
        let key = PipelineKey::new(&pass);
        let bias = key.bias_state();
        assert_eq!(bias.constant, 1);
        assert!((bias.slope_scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(key.cull_face(), Some(wgpu::Face::Front));
    }
}
