//! Backend without a GPU.
//!
//! Records every call it receives and keeps the uniform blocks and the rain
//! buffer in memory. Used by `--headless` runs and by the tests.

use glam::Mat4;

use crate::error::{resource_error, ViewerResult};
use crate::renderer::backend::{FrameBackend, ModelId, ShaderProgram};
use crate::renderer::rain_geometry::{LineVertexSink, VecSink};
use crate::renderer::uniforms::{ProgramUniforms, UniformValue};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    SetUniform { program: ShaderProgram, name: String },
    BeginShadowPass,
    EndShadowPass,
    DrawModel(ModelId, ShaderProgram),
    ShowDepthMap,
    BeginMainPass,
    AllocateRainBuffer(usize),
    ReleaseRainBuffer,
    DrawRain(u32),
    DrawSkybox(bool),
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    calls: Vec<BackendCall>,
    uniforms: ProgramUniforms,
    rain: Option<VecSink>,
    no_shadow_target: bool,
    rain_limit: Option<usize>,
    last_transform: Option<Mat4>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave as if the shadow framebuffer could not be created
    pub fn without_shadow_target(mut self) -> Self {
        self.no_shadow_target = true;
        self
    }

    /// Refuse rain buffers larger than `points`
    pub fn with_rain_limit(mut self, points: usize) -> Self {
        self.rain_limit = Some(points);
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn uniforms(&self) -> &ProgramUniforms {
        &self.uniforms
    }

    /// Capacity of the allocated rain buffer in points
    pub fn rain_capacity(&self) -> Option<usize> {
        self.rain.as_ref().map(|sink| sink.capacity_points())
    }

    pub fn rain_points(&self) -> Option<&VecSink> {
        self.rain.as_ref()
    }

    pub fn last_transform(&self) -> Option<Mat4> {
        self.last_transform
    }
}

impl FrameBackend for HeadlessBackend {
    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue) {
        self.uniforms.set(program, name, value);
        self.calls.push(BackendCall::SetUniform {
            program,
            name: name.to_string(),
        });
    }

    fn begin_shadow_pass(&mut self) -> bool {
        if self.no_shadow_target {
            return false;
        }
        self.calls.push(BackendCall::BeginShadowPass);
        true
    }

    fn end_shadow_pass(&mut self) {
        self.calls.push(BackendCall::EndShadowPass);
    }

    fn draw_model(&mut self, model: ModelId, program: ShaderProgram, transform: Mat4) {
        self.last_transform = Some(transform);
        self.calls.push(BackendCall::DrawModel(model, program));
    }

    fn show_depth_map(&mut self) {
        self.calls.push(BackendCall::ShowDepthMap);
    }

    fn begin_main_pass(&mut self) {
        self.calls.push(BackendCall::BeginMainPass);
    }

    fn allocate_rain_buffer(&mut self, points: usize) -> ViewerResult<()> {
        self.calls.push(BackendCall::AllocateRainBuffer(points));
        if let Some(limit) = self.rain_limit {
            if points > limit {
                return Err(resource_error(
                    "rain vertex buffer",
                    format!("{} points exceed the limit of {}", points, limit),
                ));
            }
        }
        self.rain = Some(VecSink::with_capacity(points));
        Ok(())
    }

    fn release_rain_buffer(&mut self) {
        self.calls.push(BackendCall::ReleaseRainBuffer);
        self.rain = None;
    }

    fn rain_buffer(&mut self) -> Option<&mut dyn LineVertexSink> {
        self.rain.as_mut().map(|sink| sink as &mut dyn LineVertexSink)
    }

    fn draw_rain(&mut self, points: u32) {
        self.calls.push(BackendCall::DrawRain(points));
    }

    fn draw_skybox(&mut self, night: bool) {
        self.uniforms.skybox.set_night(night);
        self.calls.push(BackendCall::DrawSkybox(night));
    }
}
