//! Off-screen depth target rendered from the light.

use crate::errors::{Result, UmbraError};

use super::context::{DEPTH_FORMAT, WgpuContext};

const REQUIRED_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING);

/// The shadow map: a depth texture, its view and a comparison sampler.
///
/// Nearest filtering; lookups outside the texture see a white (far) border
/// where the device supports it, and the shader treats them as lit anyway.
pub struct ShadowTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl ShadowTarget {
    /// Creates the target after checking that the device can render to and
    /// sample from it at the requested size.
    pub fn new(ctx: &WgpuContext, width: u32, height: u32) -> Result<Self> {
        Self::check_complete(ctx, width, height)?;

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: REQUIRED_USAGES,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (address_mode, border_color) = if ctx.border_clamp {
            (
                wgpu::AddressMode::ClampToBorder,
                Some(wgpu::SamplerBorderColor::OpaqueWhite),
            )
        } else {
            (wgpu::AddressMode::ClampToEdge, None)
        };

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::Less),
            border_color,
            ..Default::default()
        });

        log::info!("Shadow target ready {width}x{height}");

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    fn check_complete(ctx: &WgpuContext, width: u32, height: u32) -> Result<()> {
        let max = ctx.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(UmbraError::ShadowTargetIncomplete(format!(
                "size {width}x{height} outside 1..={max}"
            )));
        }

        let features = ctx.adapter.get_texture_format_features(DEPTH_FORMAT);
        if !features.allowed_usages.contains(REQUIRED_USAGES) {
            return Err(UmbraError::ShadowTargetIncomplete(format!(
                "{DEPTH_FORMAT:?} supports {:?}, need {REQUIRED_USAGES:?}",
                features.allowed_usages
            )));
        }
        Ok(())
    }
}
