pub mod backend;
pub mod frame_orchestrator;
mod gpu_state;
pub mod headless;
pub mod mesh;
pub mod pipelines;
pub mod rain_geometry;
mod rain_renderer;
mod shadow;
pub mod uniforms;
mod vertex;

use crate::config::ViewerConfig;
use anyhow::Result;
use winit::event_loop::EventLoop;

pub use backend::{FrameBackend, ModelId, ShaderProgram};
pub use frame_orchestrator::{FrameOrchestrator, FrameReport};
pub use gpu_state::GpuState;
pub use headless::{BackendCall, HeadlessBackend};
pub use mesh::{GpuMesh, Mesh};
pub use rain_geometry::{GeometryStager, LinePoint, LineVertexSink, VecSink};
pub use shadow::validate_texture_dimensions;
pub use uniforms::{ProgramUniforms, UniformBlock, UniformValue};
pub use vertex::Vertex;

pub fn run(event_loop: EventLoop<()>, config: ViewerConfig) -> Result<()> {
    log::info!("[renderer::run] Starting renderer initialization");
    log::debug!("[renderer::run] Config: {:?}", config);

    let result = pollster::block_on(gpu_state::run_app(event_loop, config));

    match &result {
        Ok(_) => log::info!("[renderer::run] gpu_state::run_app completed successfully"),
        Err(e) => log::error!("[renderer::run] gpu_state::run_app failed: {}", e),
    }

    result
}
