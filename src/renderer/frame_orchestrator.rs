//! Per-frame pass sequencing.
//!
//! Order: global lighting, shadow pass, point lights, optional depth-map
//! debug view (ends the frame), main pass, weather, sun marker, skybox.

use glam::{Mat4, Vec3};

use crate::audio::{AudioTrigger, ClipId};
use crate::config::{ShadowConfig, ViewerConfig};
use crate::error::{configuration_error, resource_error, ViewerResult};
use crate::renderer::backend::{FrameBackend, ModelId, ShaderProgram};
use crate::renderer::rain_geometry::GeometryStager;
use crate::scene::{SceneState, SceneToggle, MAX_POINT_LIGHTS};
use crate::weather::{RainSimulator, RandomSource, ThunderSignal, ThunderTimer};

/// What a single `render_frame` call did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub shadow_pass: bool,
    /// The frame stopped after the depth-map quad
    pub depth_map_only: bool,
    pub rain_points: u32,
    pub thunder: Option<ThunderSignal>,
    /// The weather effect failed this frame and was switched off
    pub weather_disabled: bool,
}

/// Owns the weather subsystem and drives a `FrameBackend` through one frame
pub struct FrameOrchestrator {
    /// `None` when the rain configuration was rejected; everything else keeps
    /// rendering without weather
    rain: Option<RainSimulator>,
    stager: GeometryStager,
    thunder: ThunderTimer,
    audio: Box<dyn AudioTrigger>,
    shadow: ShadowConfig,
    rain_color: Vec3,
    baseline_brightness: f32,
}

impl FrameOrchestrator {
    pub fn new(
        config: &ViewerConfig,
        rain_random: Box<dyn RandomSource>,
        thunder_random: Box<dyn RandomSource>,
        audio: Box<dyn AudioTrigger>,
    ) -> Self {
        let rain = match RainSimulator::new(config.rain.clone(), rain_random) {
            Ok(rain) => Some(rain),
            Err(e) => {
                log::error!("[FrameOrchestrator::new] Weather unavailable: {}", e);
                None
            }
        };

        Self {
            rain,
            stager: GeometryStager::new(config.rain.segment_length, config.rain.capacity),
            thunder: ThunderTimer::new(config.thunder.clone(), thunder_random),
            audio,
            shadow: config.shadow.clone(),
            rain_color: config.rain.color,
            baseline_brightness: config.thunder.baseline_brightness,
        }
    }

    pub fn rain(&self) -> Option<&RainSimulator> {
        self.rain.as_ref()
    }

    pub fn thunder(&self) -> &ThunderTimer {
        &self.thunder
    }

    /// Swap the random source used for the next rain initialisation
    pub fn reseed_rain(&mut self, random: Box<dyn RandomSource>) {
        if let Some(rain) = self.rain.as_mut() {
            rain.set_random_source(random);
        }
    }

    /// Bring the weather subsystem in line with toggles loaded from config
    pub fn apply_initial_toggles(
        &mut self,
        scene: &mut SceneState,
        backend: &mut dyn FrameBackend,
    ) -> ViewerResult<()> {
        if scene.toggles.rain {
            scene.toggles.rain = false;
            self.set_weather(true, scene, backend)?;
        } else {
            backend.set_uniform(
                ShaderProgram::Scene,
                "thunderBrightness",
                self.baseline_brightness.into(),
            );
        }
        Ok(())
    }

    /// Flip a scene toggle. Rain goes through `set_weather`; the rest only
    /// change state. Returns the new value.
    pub fn toggle(
        &mut self,
        toggle: SceneToggle,
        scene: &mut SceneState,
        backend: &mut dyn FrameBackend,
    ) -> ViewerResult<bool> {
        let value = match toggle {
            SceneToggle::Rain => {
                let enable = !scene.toggles.rain;
                self.set_weather(enable, scene, backend)?;
                scene.toggles.rain
            }
            other => scene.toggles.flip(other),
        };
        log::info!(
            "[FrameOrchestrator::toggle] {} {}",
            toggle.name(),
            if value { "on" } else { "off" }
        );
        Ok(value)
    }

    /// Switch the weather effect on or off.
    ///
    /// Enabling allocates and randomizes the drop pool and the GPU buffer;
    /// if the buffer cannot be allocated the pool is released again and the
    /// toggle stays off. Disabling releases both and forces the thunder
    /// timer back to its baseline.
    pub fn set_weather(
        &mut self,
        enabled: bool,
        scene: &mut SceneState,
        backend: &mut dyn FrameBackend,
    ) -> ViewerResult<()> {
        if enabled == scene.toggles.rain {
            return Ok(());
        }

        if !enabled {
            self.disable_weather(scene, backend);
            return Ok(());
        }

        let rain = self.rain.as_mut().ok_or_else(|| {
            configuration_error("rain", "weather subsystem is disabled by its configuration")
        })?;

        rain.initialize();
        let points = rain.config().point_capacity();
        if let Err(e) = backend.allocate_rain_buffer(points) {
            rain.teardown();
            log::error!("[FrameOrchestrator::set_weather] Could not enable rain: {}", e);
            return Err(e);
        }

        scene.toggles.rain = true;
        log::info!(
            "[FrameOrchestrator::set_weather] Rain enabled with {} drops",
            rain.len()
        );
        Ok(())
    }

    fn disable_weather(&mut self, scene: &mut SceneState, backend: &mut dyn FrameBackend) {
        if let Some(rain) = self.rain.as_mut() {
            rain.teardown();
        }
        self.stager.clear();
        backend.release_rain_buffer();
        self.thunder.reset();
        backend.set_uniform(
            ShaderProgram::Scene,
            "thunderBrightness",
            self.baseline_brightness.into(),
        );
        scene.toggles.rain = false;
        log::info!("[FrameOrchestrator::disable_weather] Rain disabled");
    }

    /// Record one frame. `dt` is the frame delta and `time` the total
    /// running time, both in seconds.
    pub fn render_frame(
        &mut self,
        scene: &mut SceneState,
        backend: &mut dyn FrameBackend,
        dt: f32,
        time: f32,
    ) -> FrameReport {
        let dt = dt.max(0.0);
        let mut report = FrameReport::default();
        let toggles = scene.toggles;
        let view = scene.view_matrix();
        let projection = scene.projection_matrix();
        let light_space = scene.sun.light_space_matrix(&self.shadow);

        let lighting = scene.lighting();
        backend.set_uniform(ShaderProgram::Scene, "lightBrightness", lighting.brightness.into());
        backend.set_uniform(ShaderProgram::Scene, "lightColor", lighting.color.into());

        if backend.begin_shadow_pass() {
            backend.set_uniform(ShaderProgram::Shadow, "time", time.into());
            backend.set_uniform(ShaderProgram::Shadow, "enableWind", toggles.wind.into());
            backend.set_uniform(ShaderProgram::Shadow, "lightSpaceTrMatrix", light_space.into());
            backend.draw_model(ModelId::Town, ShaderProgram::Shadow, Mat4::IDENTITY);
            backend.end_shadow_pass();
            report.shadow_pass = true;
        }

        self.publish_point_lights(scene, &view, backend);

        if toggles.show_depth_map {
            backend.show_depth_map();
            report.depth_map_only = true;
            return report;
        }

        backend.begin_main_pass();
        backend.set_uniform(ShaderProgram::Scene, "time", time.into());
        backend.set_uniform(ShaderProgram::Scene, "enableWind", toggles.wind.into());
        backend.set_uniform(ShaderProgram::Scene, "rainEnabled", toggles.rain.into());
        backend.set_uniform(ShaderProgram::Scene, "view", view.into());
        backend.set_uniform(ShaderProgram::Scene, "projection", projection.into());
        backend.set_uniform(ShaderProgram::Scene, "lightSpaceTrMatrix", light_space.into());
        backend.set_uniform(ShaderProgram::Scene, "lightDir", scene.sun.light_direction().into());
        backend.set_uniform(ShaderProgram::Scene, "enableFog", toggles.fog.into());
        backend.set_uniform(ShaderProgram::Scene, "fogDensity", scene.fog.density.into());
        backend.set_uniform(ShaderProgram::Scene, "fogColor", scene.fog.color.into());
        backend.draw_model(ModelId::Town, ShaderProgram::Scene, Mat4::IDENTITY);
        backend.draw_model(
            ModelId::Helicopter,
            ShaderProgram::Scene,
            scene.helicopter.transform(),
        );

        if toggles.rain {
            match self.render_weather(backend, dt, view, projection) {
                Ok((points, signal)) => {
                    report.rain_points = points;
                    report.thunder = Some(signal);
                }
                Err(e) => {
                    log::error!("[FrameOrchestrator::render_frame] Disabling rain: {}", e);
                    self.disable_weather(scene, backend);
                    report.weather_disabled = true;
                }
            }
        }

        backend.set_uniform(ShaderProgram::Light, "view", view.into());
        backend.set_uniform(ShaderProgram::Light, "projection", projection.into());
        backend.set_uniform(ShaderProgram::Light, "lightColor", lighting.color.into());
        backend.draw_model(
            ModelId::SunCube,
            ShaderProgram::Light,
            scene.sun.marker_transform(),
        );

        backend.set_uniform(ShaderProgram::Skybox, "view", view.into());
        backend.set_uniform(ShaderProgram::Skybox, "projection", projection.into());
        backend.draw_skybox(toggles.night_mode);

        report
    }

    fn publish_point_lights(&self, scene: &SceneState, view: &Mat4, backend: &mut dyn FrameBackend) {
        let lights = &scene.point_lights;
        let program = ShaderProgram::Scene;
        backend.set_uniform(program, "numPointLights", (MAX_POINT_LIGHTS as i32).into());
        backend.set_uniform(program, "pointLightPositions", lights.eye_positions(view).into());
        backend.set_uniform(program, "pointLightColor", lights.color.into());
        backend.set_uniform(program, "pointLightAmbient", lights.ambient.into());
        backend.set_uniform(program, "pointLightDiffuse", lights.diffuse.into());
        backend.set_uniform(program, "pointLightSpecular", lights.specular.into());
        backend.set_uniform(program, "constantAtt", lights.attenuation.constant.into());
        backend.set_uniform(program, "linearAtt", lights.attenuation.linear.into());
        backend.set_uniform(program, "quadraticAtt", lights.attenuation.quadratic.into());
        backend.set_uniform(program, "enablePointLight", scene.toggles.point_lights.into());
    }

    fn render_weather(
        &mut self,
        backend: &mut dyn FrameBackend,
        dt: f32,
        view: Mat4,
        projection: Mat4,
    ) -> ViewerResult<(u32, ThunderSignal)> {
        let signal = self.thunder.tick(dt, true);
        backend.set_uniform(ShaderProgram::Scene, "thunderBrightness", signal.brightness.into());
        if signal.trigger_audio {
            if let Err(e) = self.audio.play_async(ClipId::Thunder) {
                log::warn!("[FrameOrchestrator::render_weather] {}", e);
            }
        }

        let rain = self
            .rain
            .as_mut()
            .ok_or_else(|| resource_error("rain pool", "weather subsystem unavailable"))?;
        rain.advance(dt);
        self.stager.stage(rain.drops());

        let sink = backend
            .rain_buffer()
            .ok_or_else(|| resource_error("rain vertex buffer", "buffer not allocated"))?;
        self.stager.upload(sink)?;

        backend.set_uniform(ShaderProgram::Rain, "view", view.into());
        backend.set_uniform(ShaderProgram::Rain, "projection", projection.into());
        backend.set_uniform(ShaderProgram::Rain, "rainColor", self.rain_color.into());

        let points = self.stager.point_count() as u32;
        backend.draw_rain(points);
        log::trace!("[FrameOrchestrator::render_weather] Drew {} rain points", points);
        Ok((points, signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::LoggingAudio;
    use crate::error::ViewerError;
    use crate::renderer::headless::{BackendCall, HeadlessBackend};
    use crate::weather::random::seeded;

    fn small_config() -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.rain.capacity = 16;
        config
    }

    fn setup() -> (FrameOrchestrator, SceneState, HeadlessBackend) {
        let config = small_config();
        let orchestrator = FrameOrchestrator::new(
            &config,
            seeded(1),
            seeded(2),
            Box::new(LoggingAudio::new()),
        );
        let scene = SceneState::new(&config, 1280, 720);
        (orchestrator, scene, HeadlessBackend::new())
    }

    #[test]
    fn test_frame_order() {
        let (mut orchestrator, mut scene, mut backend) = setup();
        orchestrator.render_frame(&mut scene, &mut backend, 0.016, 0.016);

        let passes: Vec<_> = backend
            .calls()
            .iter()
            .filter(|c| !matches!(c, BackendCall::SetUniform { .. }))
            .cloned()
            .collect();
        assert_eq!(
            passes,
            vec![
                BackendCall::BeginShadowPass,
                BackendCall::DrawModel(ModelId::Town, ShaderProgram::Shadow),
                BackendCall::EndShadowPass,
                BackendCall::BeginMainPass,
                BackendCall::DrawModel(ModelId::Town, ShaderProgram::Scene),
                BackendCall::DrawModel(ModelId::Helicopter, ShaderProgram::Scene),
                BackendCall::DrawModel(ModelId::SunCube, ShaderProgram::Light),
                BackendCall::DrawSkybox(false),
            ]
        );
    }

    #[test]
    fn test_missing_shadow_target_skips_pass() {
        let (mut orchestrator, mut scene, _) = setup();
        let mut backend = HeadlessBackend::new().without_shadow_target();
        let report = orchestrator.render_frame(&mut scene, &mut backend, 0.016, 0.016);
        assert!(!report.shadow_pass);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::EndShadowPass)), 0);
    }

    #[test]
    fn test_rain_toggle_allocates_and_releases() {
        let (mut orchestrator, mut scene, mut backend) = setup();
        assert!(orchestrator
            .toggle(SceneToggle::Rain, &mut scene, &mut backend)
            .unwrap());
        assert_eq!(backend.rain_capacity(), Some(32));

        let report = orchestrator.render_frame(&mut scene, &mut backend, 0.016, 0.016);
        assert_eq!(report.rain_points, 32);

        assert!(!orchestrator
            .toggle(SceneToggle::Rain, &mut scene, &mut backend)
            .unwrap());
        assert_eq!(backend.rain_capacity(), None);
        assert!(!orchestrator.rain().unwrap().is_initialized());
    }

    #[test]
    fn test_failed_allocation_keeps_rain_off() {
        let (mut orchestrator, mut scene, _) = setup();
        let mut backend = HeadlessBackend::new().with_rain_limit(8);
        let err = orchestrator
            .toggle(SceneToggle::Rain, &mut scene, &mut backend)
            .unwrap_err();
        assert!(matches!(err, ViewerError::Resource { .. }));
        assert!(!scene.toggles.rain);
        assert!(!orchestrator.rain().unwrap().is_initialized());
    }

    #[test]
    fn test_disable_resets_thunder() {
        let (mut orchestrator, mut scene, mut backend) = setup();
        orchestrator
            .set_weather(true, &mut scene, &mut backend)
            .unwrap();
        orchestrator.render_frame(&mut scene, &mut backend, 10.5, 10.5);
        assert!(orchestrator.thunder().is_active());

        orchestrator
            .set_weather(false, &mut scene, &mut backend)
            .unwrap();
        assert!(!orchestrator.thunder().is_active());
        assert_eq!(backend.uniforms().scene.lighting[1], 1.0);
    }

    #[test]
    fn test_invalid_rain_config_only_disables_weather() {
        let mut config = small_config();
        config.rain.capacity = 0;
        let mut orchestrator = FrameOrchestrator::new(
            &config,
            seeded(1),
            seeded(2),
            Box::new(LoggingAudio::new()),
        );
        let mut scene = SceneState::new(&config, 640, 480);
        let mut backend = HeadlessBackend::new();

        assert!(orchestrator.rain().is_none());
        let err = orchestrator
            .toggle(SceneToggle::Rain, &mut scene, &mut backend)
            .unwrap_err();
        assert!(matches!(err, ViewerError::Configuration { .. }));

        let report = orchestrator.render_frame(&mut scene, &mut backend, 0.016, 0.016);
        assert!(report.shadow_pass);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::DrawSkybox(_))), 1);
    }
}
