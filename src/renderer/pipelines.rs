//! Render pipelines and bind group layouts for every shader program.

use crate::renderer::rain_geometry::LinePoint;
use crate::renderer::vertex::Vertex;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-draw model block; one 256-byte slot per draw in a dynamic buffer
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn new(model: glam::Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Stride between model slots, the default uniform offset alignment
pub const MODEL_SLOT_STRIDE: u64 = 256;
/// Model draws per frame
pub const MAX_MODEL_SLOTS: usize = 32;

fn uniform_entry(binding: u32, dynamic: bool, size: Option<u64>) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: size.and_then(wgpu::BufferSize::new),
        },
        count: None,
    }
}

fn depth_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Bind group layouts shared between pipeline creation and `GpuState`
pub struct Layouts {
    /// Scene uniform, shadow map, comparison sampler
    pub scene: wgpu::BindGroupLayout,
    /// Single uniform block: shadow, light, rain and skybox programs
    pub uniform: wgpu::BindGroupLayout,
    pub model: wgpu::BindGroupLayout,
    pub depth_quad: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let scene = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, false, None),
                depth_texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("scene_bind_group_layout"),
        });

        let uniform = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, false, None)],
            label: Some("uniform_bind_group_layout"),
        });

        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(
                0,
                true,
                Some(std::mem::size_of::<ModelUniform>() as u64),
            )],
            label: Some("model_bind_group_layout"),
        });

        let depth_quad = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[depth_texture_entry(0)],
            label: Some("depth_quad_bind_group_layout"),
        });

        Self {
            scene,
            uniform,
            model,
            depth_quad,
        }
    }
}

pub struct Pipelines {
    pub scene: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
    pub light: wgpu::RenderPipeline,
    pub rain: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub depth_quad: wgpu::RenderPipeline,
}

/// Settings that differ between the pipelines
struct PipelineSpec<'a> {
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    color_format: Option<wgpu::TextureFormat>,
    blend: wgpu::BlendState,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    depth: Option<wgpu::DepthStencilState>,
}

fn depth_state(write: bool, compare: wgpu::CompareFunction) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    })
}

fn build_pipeline(device: &wgpu::Device, spec: PipelineSpec) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Pipeline Layout", spec.label)),
        bind_group_layouts: spec.bind_group_layouts,
        push_constant_ranges: &[],
    });

    let targets = [spec.color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: Some(spec.blend),
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{} Pipeline", spec.label)),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: "vs_main",
            buffers: spec.buffers,
        },
        fragment: spec.color_format.map(|_| wgpu::FragmentState {
            module: spec.shader,
            entry_point: "fs_main",
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: spec.depth,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn shader(device: &wgpu::Device, label: &str, source: &'static str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, layouts: &Layouts) -> Self {
        log::info!("[Pipelines::new] Creating render pipelines for {:?}", format);

        let scene_shader = shader(device, "Scene Shader", include_str!("shaders/scene.wgsl"));
        let shadow_shader = shader(device, "Shadow Shader", include_str!("shaders/shadow.wgsl"));
        let light_shader = shader(device, "Light Shader", include_str!("shaders/light.wgsl"));
        let rain_shader = shader(device, "Rain Shader", include_str!("shaders/rain.wgsl"));
        let skybox_shader = shader(device, "Skybox Shader", include_str!("shaders/skybox.wgsl"));
        let quad_shader = shader(
            device,
            "Depth Quad Shader",
            include_str!("shaders/depth_quad.wgsl"),
        );

        let mesh_buffers = [Vertex::desc()];
        let line_buffers = [LinePoint::desc()];

        let scene = build_pipeline(
            device,
            PipelineSpec {
                label: "Scene",
                shader: &scene_shader,
                bind_group_layouts: &[&layouts.scene, &layouts.model],
                buffers: &mesh_buffers,
                color_format: Some(format),
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                depth: depth_state(true, wgpu::CompareFunction::Less),
            },
        );

        let mut shadow_depth = depth_state(true, wgpu::CompareFunction::Less);
        if let Some(depth) = shadow_depth.as_mut() {
            depth.bias = wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            };
        }
        let shadow = build_pipeline(
            device,
            PipelineSpec {
                label: "Shadow",
                shader: &shadow_shader,
                bind_group_layouts: &[&layouts.uniform, &layouts.model],
                buffers: &mesh_buffers,
                color_format: None,
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth: shadow_depth,
            },
        );

        let light = build_pipeline(
            device,
            PipelineSpec {
                label: "Light",
                shader: &light_shader,
                bind_group_layouts: &[&layouts.uniform, &layouts.model],
                buffers: &mesh_buffers,
                color_format: Some(format),
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                depth: depth_state(true, wgpu::CompareFunction::Less),
            },
        );

        let rain = build_pipeline(
            device,
            PipelineSpec {
                label: "Rain",
                shader: &rain_shader,
                bind_group_layouts: &[&layouts.uniform],
                buffers: &line_buffers,
                color_format: Some(format),
                blend: wgpu::BlendState::ALPHA_BLENDING,
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                depth: depth_state(false, wgpu::CompareFunction::Less),
            },
        );

        // Drawn last at the far plane: LessEqual so it only fills empty pixels
        let skybox = build_pipeline(
            device,
            PipelineSpec {
                label: "Skybox",
                shader: &skybox_shader,
                bind_group_layouts: &[&layouts.uniform],
                buffers: &mesh_buffers,
                color_format: Some(format),
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth: depth_state(false, wgpu::CompareFunction::LessEqual),
            },
        );

        let depth_quad = build_pipeline(
            device,
            PipelineSpec {
                label: "Depth Quad",
                shader: &quad_shader,
                bind_group_layouts: &[&layouts.depth_quad],
                buffers: &[],
                color_format: Some(format),
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                depth: None,
            },
        );

        Self {
            scene,
            shadow,
            light,
            rain,
            skybox,
            depth_quad,
        }
    }
}
