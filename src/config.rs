//! Viewer configuration
//!
//! Every section falls back to its defaults, so a config file only needs to
//! name the values it changes:
//!
//! ```toml
//! [rain]
//! capacity = 20000
//! floor = -250.0
//!
//! [toggles]
//! rain = true
//! ```

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{configuration_error, ViewerError, ViewerResult};
use crate::scene::SceneToggles;

/// Half-open `[min, max)` sampling interval. `min == max` yields a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        if self.min == self.max {
            return value == self.min;
        }
        value >= self.min && value < self.max
    }

    fn validate(&self, component: &str, name: &str) -> ViewerResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(configuration_error(
                component,
                format!("{} range [{}, {}) is invalid", name, self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Main viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub rain: RainConfig,
    pub thunder: ThunderConfig,
    pub fog: FogConfig,
    pub shadow: ShadowConfig,
    pub camera: CameraConfig,
    pub toggles: SceneToggles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tempest Viewer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Rain pool and drop sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    /// Number of drops in the pool, fixed for the lifetime of the effect
    pub capacity: usize,
    pub spawn_x: FloatRange,
    pub spawn_z: FloatRange,
    pub spawn_height: f32,
    /// Fall speed of the first wave after the effect is enabled
    pub initial_fall_speed: FloatRange,
    /// Fall speed of drops after they were recycled
    pub recycle_fall_speed: FloatRange,
    pub spawn_delay: FloatRange,
    /// Drops below this height are recycled
    pub floor: f32,
    /// Vertical length of the line drawn for each drop
    pub segment_length: f32,
    pub color: Vec3,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            capacity: 50_000,
            spawn_x: FloatRange::new(-300.0, 700.0),
            spawn_z: FloatRange::new(-250.0, 750.0),
            spawn_height: 120.0,
            initial_fall_speed: FloatRange::new(300.0, 361.0),
            recycle_fall_speed: FloatRange::new(60.0, 121.0),
            spawn_delay: FloatRange::new(0.0, 3.0),
            floor: -300.0,
            segment_length: 2.0,
            color: Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

impl RainConfig {
    pub fn validate(&self) -> ViewerResult<()> {
        if self.capacity == 0 {
            return Err(configuration_error("rain", "capacity must be greater than zero"));
        }
        self.spawn_x.validate("rain", "spawn_x")?;
        self.spawn_z.validate("rain", "spawn_z")?;
        self.initial_fall_speed.validate("rain", "initial_fall_speed")?;
        self.recycle_fall_speed.validate("rain", "recycle_fall_speed")?;
        self.spawn_delay.validate("rain", "spawn_delay")?;
        // Drops must always move downwards or they never reach the floor
        if self.initial_fall_speed.min <= 0.0 || self.recycle_fall_speed.min <= 0.0 {
            return Err(configuration_error("rain", "fall speed must be positive"));
        }
        if self.spawn_delay.min < 0.0 {
            return Err(configuration_error("rain", "spawn delay cannot be negative"));
        }
        if self.floor >= self.spawn_height {
            return Err(configuration_error(
                "rain",
                format!("floor {} must lie below spawn height {}", self.floor, self.spawn_height),
            ));
        }
        Ok(())
    }

    /// Number of line points the GPU buffer has to hold
    pub fn point_capacity(&self) -> usize {
        self.capacity * 2
    }
}

/// Thunder timer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThunderConfig {
    /// Seconds between two flashes, sampled per flash
    pub interval: FloatRange,
    /// Elapsed time of the very first flash
    pub first_threshold: f32,
    pub duration: f32,
    pub flash_brightness: f32,
    pub baseline_brightness: f32,
}

impl Default for ThunderConfig {
    fn default() -> Self {
        Self {
            interval: FloatRange::new(7.0, 12.0),
            first_threshold: 10.0,
            duration: 1.0,
            flash_brightness: 10.0,
            baseline_brightness: 1.0,
        }
    }
}

impl ThunderConfig {
    pub fn validate(&self) -> ViewerResult<()> {
        self.interval.validate("thunder", "interval")?;
        if self.duration < 0.0 {
            return Err(configuration_error("thunder", "duration cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub density: f32,
    pub color: Vec4,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            density: 0.02,
            color: Vec4::new(0.5, 0.5, 0.5, 1.0),
        }
    }
}

/// Directional shadow map parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Requested square map size, clamped to the device limit
    pub map_size: u32,
    pub ortho_size: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 4096,
            ortho_size: 50.0,
            near_plane: -100.0,
            far_plane: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Units per second
    pub speed: f32,
    pub boost_multiplier: f32,
    pub mouse_sensitivity: f32,
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 40.0, 5.5),
            target: Vec3::ZERO,
            speed: 30.0,
            boost_multiplier: 4.0,
            mouse_sensitivity: 0.1,
            fov_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

impl ViewerConfig {
    /// Load a config file, picking the format from the extension (`.json`
    /// or anything else as TOML)
    pub fn load(path: impl AsRef<Path>) -> ViewerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ViewerError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
        .map_err(|reason| ViewerError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        })?;

        config.validate()?;
        log::info!("[ViewerConfig::load] Loaded config from {:?}", path);
        Ok(config)
    }

    fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    /// Checks everything but the rain section. A bad rain section only
    /// disables the weather effect, so `RainSimulator::new` rejects it.
    pub fn validate(&self) -> ViewerResult<()> {
        self.thunder.validate()?;
        if self.window.width == 0 || self.window.height == 0 {
            return Err(configuration_error("window", "window size must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rain.capacity, 50_000);
        assert_eq!(config.rain.point_capacity(), 100_000);
        assert_eq!(config.thunder.interval, FloatRange::new(7.0, 12.0));
    }

    #[test]
    fn test_zero_capacity_rejected_by_rain_only() {
        let mut config = ViewerConfig::default();
        config.rain.capacity = 0;
        assert!(matches!(
            config.rain.validate(),
            Err(ViewerError::Configuration { .. })
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_fall_speed_rejected() {
        let mut rain = RainConfig::default();
        rain.initial_fall_speed = FloatRange::new(-50.0, 10.0);
        assert!(matches!(rain.validate(), Err(ViewerError::Configuration { .. })));

        let mut rain = RainConfig::default();
        rain.recycle_fall_speed = FloatRange::new(0.0, 121.0);
        assert!(rain.validate().is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut rain = RainConfig::default();
        rain.spawn_delay = FloatRange::new(3.0, 0.0);
        assert!(rain.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [rain]
            capacity = 128
            floor = -50.0

            [toggles]
            rain = true
            "#,
        )
        .unwrap();
        assert_eq!(config.rain.capacity, 128);
        assert_eq!(config.rain.floor, -50.0);
        assert_eq!(config.rain.spawn_height, 120.0);
        assert!(config.toggles.rain);
        assert!(!config.toggles.fog);
        assert_eq!(config.thunder.duration, 1.0);
    }

    #[test]
    fn test_range_contains() {
        let range = FloatRange::new(0.0, 3.0);
        assert!(range.contains(0.0));
        assert!(range.contains(2.999));
        assert!(!range.contains(3.0));
        assert!(FloatRange::new(2.0, 2.0).contains(2.0));
    }
}
