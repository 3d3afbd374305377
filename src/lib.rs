pub mod audio;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod weather;

use anyhow::Result;
use winit::event_loop::EventLoop;

pub use audio::{AudioTrigger, ClipId};
pub use camera::{Camera, CameraTour, Projection};
pub use config::ViewerConfig;
pub use error::{ViewerError, ViewerResult};
pub use renderer::{FrameBackend, FrameOrchestrator, FrameReport, HeadlessBackend};
pub use scene::{SceneState, SceneToggle, SceneToggles};
pub use weather::{RainSimulator, ThunderTimer};

/// Fixed timestep used by headless runs
pub const HEADLESS_TIMESTEP: f32 = 1.0 / 60.0;

/// Totals collected over a headless run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadlessSummary {
    pub frames: u32,
    pub shadow_passes: u32,
    pub thunder_strikes: u32,
    pub last_rain_points: u32,
    pub weather_disabled: bool,
}

/// Entry point owning the viewer configuration
pub struct Viewer {
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Open the window and run until it is closed
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        renderer::run(event_loop, self.config)
    }

    /// Drive `frames` frames against the recording backend with seeded
    /// randomness. Used for smoke runs on machines without a GPU.
    pub fn run_headless(self, frames: u32, seed: u64) -> Result<HeadlessSummary> {
        if let Err(e) = env_logger::try_init() {
            log::debug!("[Viewer::run_headless] env_logger already initialized: {}", e);
        }

        let mut backend = HeadlessBackend::new();
        let mut scene = SceneState::new(&self.config, self.config.window.width, self.config.window.height);
        let mut input = input::InputState::default();
        let mut orchestrator = FrameOrchestrator::new(
            &self.config,
            weather::random::seeded(seed),
            weather::random::seeded(seed.wrapping_add(1)),
            Box::new(audio::LoggingAudio::new()),
        );
        if let Err(e) = orchestrator.apply_initial_toggles(&mut scene, &mut backend) {
            log::error!("[Viewer::run_headless] Starting without weather: {}", e);
        }

        let mut summary = HeadlessSummary::default();
        for frame in 0..frames {
            let time = frame as f32 * HEADLESS_TIMESTEP;
            scene.update(HEADLESS_TIMESTEP, &mut input);
            let report = orchestrator.render_frame(&mut scene, &mut backend, HEADLESS_TIMESTEP, time);
            backend.take_calls();

            summary.frames += 1;
            if report.shadow_pass {
                summary.shadow_passes += 1;
            }
            if report.thunder.map_or(false, |signal| signal.trigger_audio) {
                summary.thunder_strikes += 1;
            }
            summary.last_rain_points = report.rain_points;
            summary.weather_disabled |= report.weather_disabled;
        }

        log::info!("[Viewer::run_headless] {:?}", summary);
        Ok(summary)
    }
}
