/// Scene Module
///
/// Everything the frame needs to know about the world besides the weather:
/// which effects are switched on, the camera, the sun, the lamps and the
/// helicopter. Held in one explicit `SceneState` owned by the render loop.

pub mod helicopter;
pub mod lights;
pub mod sun;

pub use helicopter::HelicopterState;
pub use lights::{Attenuation, PointLightSet, MAX_POINT_LIGHTS};
pub use sun::{DayNightLighting, Sun};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraTour, Projection};
use crate::config::{CameraConfig, ViewerConfig};
use crate::input::InputState;
use crate::weather::FogSettings;

/// Individually switchable scene features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneToggle {
    Fog,
    Wind,
    Rain,
    NightMode,
    PointLights,
    HelicopterRotation,
    DepthMap,
}

impl SceneToggle {
    pub fn name(&self) -> &'static str {
        match self {
            SceneToggle::Fog => "fog",
            SceneToggle::Wind => "wind",
            SceneToggle::Rain => "rain",
            SceneToggle::NightMode => "night mode",
            SceneToggle::PointLights => "point lights",
            SceneToggle::HelicopterRotation => "helicopter rotation",
            SceneToggle::DepthMap => "depth map",
        }
    }
}

/// Current on/off state of every toggle. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneToggles {
    pub fog: bool,
    pub wind: bool,
    pub rain: bool,
    pub night_mode: bool,
    pub point_lights: bool,
    pub helicopter_rotation: bool,
    pub show_depth_map: bool,
}

impl SceneToggles {
    pub fn get(&self, toggle: SceneToggle) -> bool {
        match toggle {
            SceneToggle::Fog => self.fog,
            SceneToggle::Wind => self.wind,
            SceneToggle::Rain => self.rain,
            SceneToggle::NightMode => self.night_mode,
            SceneToggle::PointLights => self.point_lights,
            SceneToggle::HelicopterRotation => self.helicopter_rotation,
            SceneToggle::DepthMap => self.show_depth_map,
        }
    }

    pub fn set(&mut self, toggle: SceneToggle, value: bool) {
        let slot = match toggle {
            SceneToggle::Fog => &mut self.fog,
            SceneToggle::Wind => &mut self.wind,
            SceneToggle::Rain => &mut self.rain,
            SceneToggle::NightMode => &mut self.night_mode,
            SceneToggle::PointLights => &mut self.point_lights,
            SceneToggle::HelicopterRotation => &mut self.helicopter_rotation,
            SceneToggle::DepthMap => &mut self.show_depth_map,
        };
        *slot = value;
    }

    /// Flip a toggle and return its new value
    pub fn flip(&mut self, toggle: SceneToggle) -> bool {
        let value = !self.get(toggle);
        self.set(toggle, value);
        value
    }
}

/// Explicit per-viewer scene state
#[derive(Debug, Clone)]
pub struct SceneState {
    pub toggles: SceneToggles,
    pub camera: Camera,
    pub projection: Projection,
    pub sun: Sun,
    pub helicopter: HelicopterState,
    pub point_lights: PointLightSet,
    pub fog: FogSettings,
    pub tour: CameraTour,
    camera_config: CameraConfig,
}

impl SceneState {
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        let camera_config = config.camera.clone();
        Self {
            toggles: config.toggles,
            camera: Camera::new(camera_config.position, camera_config.target, Vec3::Y),
            projection: Projection::new(
                width,
                height,
                camera_config.fov_degrees,
                camera_config.znear,
                camera_config.zfar,
            ),
            sun: Sun::default(),
            helicopter: HelicopterState::new(),
            point_lights: PointLightSet::default(),
            fog: FogSettings::from_config(&config.fog),
            tour: CameraTour::default(),
            camera_config,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.camera.view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn lighting(&self) -> DayNightLighting {
        DayNightLighting::for_mode(self.toggles.night_mode)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    /// Apply held input and advance the animated parts of the scene.
    /// WASD movement is ignored while the camera tour is flying.
    pub fn update(&mut self, dt: f32, input: &mut InputState) {
        if let Some(position) = self.tour.update(dt) {
            self.camera.set_position(position);
        } else {
            let mut speed = self.camera_config.speed * dt;
            if input.is_boosting() {
                speed *= self.camera_config.boost_multiplier;
            }
            for direction in input.held_moves() {
                self.camera.move_in(direction, speed);
            }
        }

        let (dx, dy) = input.take_mouse_delta();
        if dx != 0.0 || dy != 0.0 {
            let sensitivity = self.camera_config.mouse_sensitivity;
            // Screen Y grows downwards
            self.camera.look(dx * sensitivity, -dy * sensitivity);
        }

        let sun_delta = input.sun_rotation();
        if sun_delta != 0.0 {
            self.sun.rotate(sun_delta);
        }

        self.helicopter.update(dt, self.toggles.helicopter_rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;
    use winit::event::ElementState;

    #[test]
    fn test_toggles_default_off() {
        let toggles = SceneToggles::default();
        assert!(!toggles.rain && !toggles.fog && !toggles.show_depth_map);
    }

    #[test]
    fn test_flip_round_trip() {
        let mut toggles = SceneToggles::default();
        assert!(toggles.flip(SceneToggle::NightMode));
        assert!(toggles.night_mode);
        assert!(!toggles.flip(SceneToggle::NightMode));
    }

    #[test]
    fn test_update_moves_camera() {
        let mut scene = SceneState::new(&ViewerConfig::default(), 1280, 720);
        let mut input = InputState::new();
        let start = scene.camera.position();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        scene.update(0.1, &mut input);
        assert!((scene.camera.position() - start).length() > 1.0);
    }

    #[test]
    fn test_tour_overrides_movement() {
        let mut scene = SceneState::new(&ViewerConfig::default(), 1280, 720);
        let mut input = InputState::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        scene.tour.start();
        scene.update(0.0, &mut input);
        assert!((scene.camera.position() - crate::camera::tour::TOUR_WAYPOINTS[0]).length() < 1e-4);
    }

    #[test]
    fn test_lighting_follows_night_toggle() {
        let mut scene = SceneState::new(&ViewerConfig::default(), 1280, 720);
        assert_eq!(scene.lighting().brightness, 1.0);
        scene.toggles.flip(SceneToggle::NightMode);
        assert_eq!(scene.lighting().brightness, 0.5);
    }
}
