//! The drawing surface the frame orchestrator talks to.
//!
//! `GpuState` implements it on top of wgpu; tests implement it with a
//! recorder so pass ordering can be checked without a device.

use glam::Mat4;

use crate::error::ViewerResult;
use crate::renderer::rain_geometry::LineVertexSink;
use crate::renderer::uniforms::UniformValue;

/// Shader programs the frame publishes uniforms to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Lit, shadowed, fogged static geometry
    Scene,
    /// Depth-only pass from the sun
    Shadow,
    /// Unlit sun marker
    Light,
    /// Full-screen shadow map visualisation
    ScreenQuad,
    Skybox,
    Rain,
}

/// Meshes the backend knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// Ground, buildings and lamp posts
    Town,
    Helicopter,
    SunCube,
}

/// Per-frame drawing operations, called in pass order by the orchestrator
pub trait FrameBackend {
    /// Publish a named uniform. Unknown names are skipped.
    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue);

    /// Start rendering into the shadow map. Returns false when there is no
    /// shadow target, in which case the pass is skipped.
    fn begin_shadow_pass(&mut self) -> bool;

    fn end_shadow_pass(&mut self);

    fn draw_model(&mut self, model: ModelId, program: ShaderProgram, transform: Mat4);

    /// Draw the shadow map as a full-screen quad
    fn show_depth_map(&mut self);

    fn begin_main_pass(&mut self);

    /// Allocate the rain vertex buffer for `points` line points
    fn allocate_rain_buffer(&mut self, points: usize) -> ViewerResult<()>;

    fn release_rain_buffer(&mut self);

    /// The rain vertex buffer, if allocated
    fn rain_buffer(&mut self) -> Option<&mut dyn LineVertexSink>;

    /// Draw the first `points` points of the rain buffer as a line list
    fn draw_rain(&mut self, points: u32);

    fn draw_skybox(&mut self, night: bool);
}
