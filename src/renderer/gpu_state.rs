use std::iter;
use std::sync::Arc;

use anyhow::Result;
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, ElementState, Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::audio::{AudioDispatcher, AudioTrigger, LoggingAudio};
use crate::config::ViewerConfig;
use crate::error::{ViewerError, ViewerErrorContext, ViewerResult};
use crate::input::{action_for_key, InputState, KeyAction};
use crate::renderer::backend::{FrameBackend, ModelId, ShaderProgram};
use crate::renderer::frame_orchestrator::FrameOrchestrator;
use crate::renderer::mesh::{self, GpuMesh};
use crate::renderer::pipelines::{
    Layouts, ModelUniform, Pipelines, DEPTH_FORMAT, MAX_MODEL_SLOTS, MODEL_SLOT_STRIDE,
};
use crate::renderer::rain_geometry::LineVertexSink;
use crate::renderer::rain_renderer::RainBuffer;
use crate::renderer::shadow::{create_shadow_sampler, validate_texture_dimensions, ShadowTarget};
use crate::renderer::uniforms::{ProgramUniforms, UniformBlock, UniformValue};
use crate::scene::SceneState;
use crate::weather::random;

/// Draw recorded during the main pass
#[derive(Debug, Clone, Copy)]
enum DrawOp {
    Model {
        model: ModelId,
        program: ShaderProgram,
        slot: u32,
    },
    Rain {
        points: u32,
    },
    Skybox,
}

/// Everything the orchestrator asked for since the last submit
#[derive(Debug, Default)]
struct PendingFrame {
    shadow_pass: bool,
    in_shadow_pass: bool,
    depth_map: bool,
    shadow_ops: Vec<(ModelId, u32)>,
    main_ops: Vec<DrawOp>,
    models: Vec<ModelUniform>,
}

impl PendingFrame {
    fn push_model(&mut self, transform: Mat4) -> Option<u32> {
        if self.models.len() >= MAX_MODEL_SLOTS {
            return None;
        }
        self.models.push(ModelUniform::new(transform));
        Some((self.models.len() - 1) as u32)
    }
}

struct UniformBuffers {
    scene: wgpu::Buffer,
    shadow: wgpu::Buffer,
    light: wgpu::Buffer,
    rain: wgpu::Buffer,
    skybox: wgpu::Buffer,
    model: wgpu::Buffer,
}

struct BindGroups {
    scene: wgpu::BindGroup,
    shadow: wgpu::BindGroup,
    light: wgpu::BindGroup,
    rain: wgpu::BindGroup,
    skybox: wgpu::BindGroup,
    model: wgpu::BindGroup,
    /// Only present when the shadow map exists
    depth_quad: Option<wgpu::BindGroup>,
}

struct Meshes {
    town: GpuMesh,
    helicopter: GpuMesh,
    sun_cube: GpuMesh,
    sky: GpuMesh,
}

impl Meshes {
    fn upload(device: &wgpu::Device) -> Self {
        Self {
            town: GpuMesh::upload(device, "Town", &mesh::town()),
            helicopter: GpuMesh::upload(device, "Helicopter", &mesh::helicopter()),
            sun_cube: GpuMesh::upload(device, "Sun Cube", &mesh::cube([1.0, 0.95, 0.6])),
            sky: GpuMesh::upload(device, "Sky Cube", &mesh::cube([1.0, 1.0, 1.0])),
        }
    }

    fn get(&self, model: ModelId) -> &GpuMesh {
        match model {
            ModelId::Town => &self.town,
            ModelId::Helicopter => &self.helicopter,
            ModelId::SunCube => &self.sun_cube,
        }
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, contents: &[u8]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some(label),
    })
}

/// wgpu implementation of `FrameBackend`.
///
/// Draw requests are recorded into a pending frame and encoded in
/// [`GpuState::render`]; uniform blocks are uploaded once per frame there.
pub struct GpuState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_texture: wgpu::TextureView,
    shadow: Option<ShadowTarget>,
    pipelines: Pipelines,
    uniforms: ProgramUniforms,
    buffers: UniformBuffers,
    bind_groups: BindGroups,
    meshes: Meshes,
    rain: Option<RainBuffer>,
    frame: PendingFrame,
}

impl GpuState {
    async fn new(window: Arc<Window>, viewer_config: &ViewerConfig) -> ViewerResult<Self> {
        log::info!("[GpuState::new] Starting GPU initialization");
        let init_start = std::time::Instant::now();

        let size = window.inner_size();
        log::debug!("[GpuState::new] Window size: {}x{}", size.width, size.height);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| {
                log::error!("[GpuState::new] Failed to create surface: {}", e);
                e
            })
            .viewer_context("surface")?;

        // High performance first, then low power, then the software fallback
        let mut adapter = None;
        for (power_preference, force_fallback_adapter) in [
            (wgpu::PowerPreference::HighPerformance, false),
            (wgpu::PowerPreference::LowPower, false),
            (wgpu::PowerPreference::LowPower, true),
        ] {
            adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter,
                })
                .await;
            if adapter.is_some() {
                break;
            }
            log::warn!(
                "[GpuState::new] No adapter for {:?} (fallback: {}), trying next option",
                power_preference,
                force_fallback_adapter
            );
        }
        let adapter = adapter.ok_or_else(|| {
            log::error!("[GpuState::new] No suitable GPU adapter found!");
            ViewerError::Context {
                component: "adapter".to_string(),
                error: "no GPU adapter available".to_string(),
            }
        })?;

        let info = adapter.get_info();
        log::info!("[GpuState::new] Adapter: {} ({:?})", info.name, info.device_type);
        log::info!("[GpuState::new] Backend: {:?}", info.backend);

        let adapter_limits = adapter.limits();
        log::info!(
            "[GpuState::new]   max_texture_dimension_2d: {}",
            adapter_limits.max_texture_dimension_2d
        );
        log::info!(
            "[GpuState::new]   max_buffer_size: {} MB",
            adapter_limits.max_buffer_size / 1024 / 1024
        );
        let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    label: Some("Tempest Viewer Device"),
                },
                None,
            )
            .await
            .map_err(|e| {
                log::error!("[GpuState::new] Failed to create GPU device: {}", e);
                e
            })
            .viewer_context("device")?;

        device.on_uncaptured_error(Box::new(|error| {
            log::error!("[GPU] Uncaptured device error: {:?}", error);
            if let wgpu::Error::OutOfMemory { .. } = error {
                log::error!("[GPU] Out of GPU memory!");
            }
        }));
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            log::error!("[GpuState::new] No surface formats available!");
            return Err(ViewerError::Context {
                component: "surface".to_string(),
                error: "no surface formats supported".to_string(),
            });
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!(
                    "[GpuState::new] No sRGB format found, using first available: {:?}",
                    first_format
                );
                first_format
            });

        let present_mode = if surface_caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            log::warn!("[GpuState::new] Fifo not available, using AutoVsync");
            wgpu::PresentMode::AutoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "[GpuState::new] Surface configured {}x{} {:?} {:?}",
            config.width,
            config.height,
            surface_format,
            present_mode
        );

        let depth_texture = create_depth_texture(&device, &config);

        // A missing shadow map only disables the shadow pass
        let shadow = match ShadowTarget::create(&device, viewer_config.shadow.map_size) {
            Ok(target) => Some(target),
            Err(e) => {
                log::error!("[GpuState::new] Shadow pass disabled: {}", e);
                None
            }
        };

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, surface_format, &layouts);
        let uniforms = ProgramUniforms::default();

        let buffers = UniformBuffers {
            scene: uniform_buffer(&device, "Scene Uniform Buffer", uniforms.scene.as_bytes()),
            shadow: uniform_buffer(&device, "Shadow Uniform Buffer", uniforms.shadow.as_bytes()),
            light: uniform_buffer(&device, "Light Uniform Buffer", uniforms.light.as_bytes()),
            rain: uniform_buffer(&device, "Rain Uniform Buffer", uniforms.rain.as_bytes()),
            skybox: uniform_buffer(&device, "Skybox Uniform Buffer", uniforms.skybox.as_bytes()),
            model: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Model Uniform Buffer"),
                size: MODEL_SLOT_STRIDE * MAX_MODEL_SLOTS as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        };

        let placeholder;
        let shadow_view = match &shadow {
            Some(target) => &target.view,
            None => {
                placeholder = ShadowTarget::placeholder(&device);
                &placeholder
            }
        };
        let shadow_sampler = create_shadow_sampler(&device);

        let bind_groups = BindGroups {
            scene: device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &layouts.scene,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.scene.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(shadow_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                    },
                ],
                label: Some("scene_bind_group"),
            }),
            shadow: uniform_bind_group(&device, &layouts.uniform, "shadow_bind_group", &buffers.shadow),
            light: uniform_bind_group(&device, &layouts.uniform, "light_bind_group", &buffers.light),
            rain: uniform_bind_group(&device, &layouts.uniform, "rain_bind_group", &buffers.rain),
            skybox: uniform_bind_group(&device, &layouts.uniform, "skybox_bind_group", &buffers.skybox),
            model: device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &layouts.model,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffers.model,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                    }),
                }],
                label: Some("model_bind_group"),
            }),
            depth_quad: shadow.as_ref().map(|target| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &layouts.depth_quad,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&target.view),
                    }],
                    label: Some("depth_quad_bind_group"),
                })
            }),
        };

        let meshes = Meshes::upload(&device);

        log::info!(
            "[GpuState::new] GPU initialization complete in {:?}",
            init_start.elapsed()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth_texture,
            shadow,
            pipelines,
            uniforms,
            buffers,
            bind_groups,
            meshes,
            rain: None,
            frame: PendingFrame::default(),
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
            log::debug!(
                "[GpuState::resize] Surface resized to {}x{}",
                new_size.width,
                new_size.height
            );
        }
    }

    fn write_uniforms(&self, frame: &PendingFrame) {
        self.queue
            .write_buffer(&self.buffers.scene, 0, self.uniforms.scene.as_bytes());
        self.queue
            .write_buffer(&self.buffers.shadow, 0, self.uniforms.shadow.as_bytes());
        self.queue
            .write_buffer(&self.buffers.light, 0, self.uniforms.light.as_bytes());
        self.queue
            .write_buffer(&self.buffers.rain, 0, self.uniforms.rain.as_bytes());
        self.queue
            .write_buffer(&self.buffers.skybox, 0, self.uniforms.skybox.as_bytes());
        for (slot, model) in frame.models.iter().enumerate() {
            self.queue.write_buffer(
                &self.buffers.model,
                slot as u64 * MODEL_SLOT_STRIDE,
                bytemuck::bytes_of(model),
            );
        }
    }

    /// Encode and present everything recorded since the previous call
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = std::mem::take(&mut self.frame);
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.write_uniforms(&frame);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if let (true, Some(shadow)) = (frame.shadow_pass, &self.shadow) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &shadow.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines.shadow);
            pass.set_bind_group(0, &self.bind_groups.shadow, &[]);
            for &(model, slot) in &frame.shadow_ops {
                pass.set_bind_group(1, &self.bind_groups.model, &[model_offset(slot)]);
                self.meshes.get(model).draw(&mut pass);
            }
        }

        if frame.depth_map {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Map Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(bind_group) = &self.bind_groups.depth_quad {
                pass.set_pipeline(&self.pipelines.depth_quad);
                pass.set_bind_group(0, bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        } else {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for op in &frame.main_ops {
                match *op {
                    DrawOp::Model {
                        model,
                        program,
                        slot,
                    } => {
                        let (pipeline, bind_group) = match program {
                            ShaderProgram::Scene => (&self.pipelines.scene, &self.bind_groups.scene),
                            ShaderProgram::Light => (&self.pipelines.light, &self.bind_groups.light),
                            other => {
                                log::warn!(
                                    "[GpuState::render] {:?} cannot draw models in the main pass",
                                    other
                                );
                                continue;
                            }
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_bind_group(0, bind_group, &[]);
                        pass.set_bind_group(1, &self.bind_groups.model, &[model_offset(slot)]);
                        self.meshes.get(model).draw(&mut pass);
                    }
                    DrawOp::Rain { points } => {
                        if let Some(rain) = &self.rain {
                            pass.set_pipeline(&self.pipelines.rain);
                            pass.set_bind_group(0, &self.bind_groups.rain, &[]);
                            pass.set_vertex_buffer(0, rain.buffer().slice(..));
                            pass.draw(0..points, 0..1);
                        }
                    }
                    DrawOp::Skybox => {
                        pass.set_pipeline(&self.pipelines.skybox);
                        pass.set_bind_group(0, &self.bind_groups.skybox, &[]);
                        self.meshes.sky.draw(&mut pass);
                    }
                }
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn model_offset(slot: u32) -> u32 {
    slot * MODEL_SLOT_STRIDE as u32
}

impl FrameBackend for GpuState {
    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue) {
        self.uniforms.set(program, name, value);
    }

    fn begin_shadow_pass(&mut self) -> bool {
        if self.shadow.is_none() {
            return false;
        }
        self.frame.shadow_pass = true;
        self.frame.in_shadow_pass = true;
        true
    }

    fn end_shadow_pass(&mut self) {
        self.frame.in_shadow_pass = false;
    }

    fn draw_model(&mut self, model: ModelId, program: ShaderProgram, transform: Mat4) {
        let Some(slot) = self.frame.push_model(transform) else {
            log::warn!(
                "[GpuState::draw_model] Out of model slots, skipping {:?}",
                model
            );
            return;
        };
        if self.frame.in_shadow_pass {
            self.frame.shadow_ops.push((model, slot));
        } else {
            self.frame.main_ops.push(DrawOp::Model {
                model,
                program,
                slot,
            });
        }
    }

    fn show_depth_map(&mut self) {
        self.frame.depth_map = true;
    }

    fn begin_main_pass(&mut self) {
        self.frame.in_shadow_pass = false;
    }

    fn allocate_rain_buffer(&mut self, points: usize) -> ViewerResult<()> {
        self.rain = Some(RainBuffer::allocate(&self.device, self.queue.clone(), points)?);
        Ok(())
    }

    fn release_rain_buffer(&mut self) {
        if self.rain.take().is_some() {
            log::info!("[GpuState::release_rain_buffer] Rain vertex buffer released");
        }
    }

    fn rain_buffer(&mut self) -> Option<&mut dyn LineVertexSink> {
        self.rain
            .as_mut()
            .map(|buffer| buffer as &mut dyn LineVertexSink)
    }

    fn draw_rain(&mut self, points: u32) {
        self.frame.main_ops.push(DrawOp::Rain { points });
    }

    fn draw_skybox(&mut self, night: bool) {
        self.uniforms.skybox.set_night(night);
        self.frame.main_ops.push(DrawOp::Skybox);
    }
}

/// Creates a depth texture with validated dimensions
fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let max_texture_dimension = device.limits().max_texture_dimension_2d;
    let (width, height, was_clamped) =
        validate_texture_dimensions(config.width, config.height, max_texture_dimension);

    if was_clamped {
        log::warn!(
            "[create_depth_texture] Texture dimensions clamped from {}x{} to {}x{} due to GPU limits (max: {})",
            config.width, config.height, width, height, max_texture_dimension
        );
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn grab_cursor(window: &Window) {
    match window.set_cursor_grab(CursorGrabMode::Locked) {
        Ok(_) => window.set_cursor_visible(false),
        Err(e) => {
            log::warn!(
                "[gpu_state::run_app] Cursor lock failed: {:?}. Trying confined mode...",
                e
            );
            window.set_cursor_grab(CursorGrabMode::Confined).ok();
            window.set_cursor_visible(false);
        }
    }
}

pub async fn run_app(event_loop: EventLoop<()>, config: ViewerConfig) -> Result<()> {
    log::info!("[gpu_state::run_app] Starting viewer");

    if let Err(e) = env_logger::try_init() {
        log::debug!("[gpu_state::run_app] env_logger already initialized: {}", e);
    }

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)
            .map_err(|e| {
                log::error!("[gpu_state::run_app] Window creation failed: {}", e);
                e
            })?,
    );

    let mut gpu_state = GpuState::new(window.clone(), &config).await?;
    let size = gpu_state.size();
    let mut scene = SceneState::new(&config, size.width.max(1), size.height.max(1));
    let mut input = InputState::default();

    let audio: Box<dyn AudioTrigger> = match AudioDispatcher::logging() {
        Ok(dispatcher) => Box::new(dispatcher),
        Err(e) => {
            log::warn!("[gpu_state::run_app] Audio worker unavailable: {}", e);
            Box::new(LoggingAudio::new())
        }
    };
    let mut orchestrator = FrameOrchestrator::new(
        &config,
        random::from_entropy(),
        random::from_entropy(),
        audio,
    );
    if let Err(e) = orchestrator.apply_initial_toggles(&mut scene, &mut gpu_state) {
        log::error!("[gpu_state::run_app] Starting without weather: {}", e);
    }

    grab_cursor(&gpu_state.window);
    gpu_state.window.request_redraw();

    let start = std::time::Instant::now();
    let mut last_frame = start;
    let mut frame_count: u64 = 0;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == gpu_state.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(physical_size) => {
                gpu_state.resize(*physical_size);
                scene.resize(physical_size.width, physical_size.height);
            }
            WindowEvent::Focused(false) => input.clear(),
            WindowEvent::Focused(true) => grab_cursor(&gpu_state.window),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let newly_pressed = input.process_key(code, event.state);
                if !newly_pressed || event.state != ElementState::Pressed {
                    return;
                }
                match action_for_key(code) {
                    Some(KeyAction::Toggle(toggle)) => {
                        if let Err(e) = orchestrator.toggle(toggle, &mut scene, &mut gpu_state) {
                            log::error!("[gpu_state::run_app] {} toggle failed: {}", toggle.name(), e);
                        }
                    }
                    Some(KeyAction::StartTour) => scene.tour.start(),
                    Some(KeyAction::Exit) => elwt.exit(),
                    None => {}
                }
            }
            WindowEvent::RedrawRequested => {
                let now = std::time::Instant::now();
                let dt = (now - last_frame).as_secs_f32();
                last_frame = now;
                let time = (now - start).as_secs_f32();

                scene.update(dt, &mut input);
                let report = orchestrator.render_frame(&mut scene, &mut gpu_state, dt, time);
                if report.weather_disabled {
                    log::warn!("[gpu_state::run_app] Weather switched off after an error");
                }

                frame_count += 1;
                if frame_count % 600 == 0 {
                    log::debug!(
                        "[gpu_state::run_app] Frame {} ({:.1} fps), rain points {}",
                        frame_count,
                        1.0 / dt.max(f32::EPSILON),
                        report.rain_points
                    );
                }

                match gpu_state.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        gpu_state.resize(gpu_state.size)
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("[gpu_state::run_app] Surface out of memory, exiting");
                        elwt.exit()
                    }
                    Err(e) => log::warn!("[gpu_state::run_app] Render error: {:?}", e),
                }
            }
            _ => {}
        },
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => input.process_mouse_motion(delta),
        Event::AboutToWait => gpu_state.window.request_redraw(),
        _ => {}
    })?;

    log::info!("[gpu_state::run_app] Event loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_frame_slots_are_bounded() {
        let mut frame = PendingFrame::default();
        for slot in 0..MAX_MODEL_SLOTS {
            assert_eq!(frame.push_model(Mat4::IDENTITY), Some(slot as u32));
        }
        assert_eq!(frame.push_model(Mat4::IDENTITY), None);
    }

    #[test]
    fn test_model_offsets_follow_stride() {
        assert_eq!(model_offset(0), 0);
        assert_eq!(model_offset(3), 3 * MODEL_SLOT_STRIDE as u32);
    }
}
