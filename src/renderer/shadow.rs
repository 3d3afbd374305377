use crate::error::{resource_error, ViewerResult};
use crate::renderer::pipelines::DEPTH_FORMAT;

/// Validates and clamps texture dimensions to GPU limits.
/// Returns (clamped_width, clamped_height, was_clamped)
pub fn validate_texture_dimensions(
    requested_width: u32,
    requested_height: u32,
    max_dimension: u32,
) -> (u32, u32, bool) {
    let clamped_width = requested_width.min(max_dimension);
    let clamped_height = requested_height.min(max_dimension);
    let was_clamped = clamped_width != requested_width || clamped_height != requested_height;

    (clamped_width, clamped_height, was_clamped)
}

/// Depth texture rendered from the sun and sampled by the scene shader
pub struct ShadowTarget {
    pub view: wgpu::TextureView,
    pub size: u32,
}

impl ShadowTarget {
    /// Allocate the square shadow map. Allocation errors are caught with an
    /// error scope and reported as a resource error.
    pub fn create(device: &wgpu::Device, requested_size: u32) -> ViewerResult<Self> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let (size, _, was_clamped) =
            validate_texture_dimensions(requested_size.max(1), requested_size.max(1), max_dimension);
        if was_clamped {
            log::warn!(
                "[ShadowTarget::create] Shadow map clamped from {} to {} (device limit)",
                requested_size,
                size
            );
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(resource_error("shadow map", error));
        }

        log::info!("[ShadowTarget::create] Shadow map {}x{}", size, size);
        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size,
        })
    }

    /// 1x1 stand-in bound to the scene shader when no shadow map exists
    pub fn placeholder(device: &wgpu::Device) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Shadow Map Placeholder"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// Comparison sampler for percentage-closer filtering
pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Shadow Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}
