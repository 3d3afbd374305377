use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::ShadowConfig;

/// Sun position before any rotation
pub const SUN_BASE_POSITION: Vec3 = Vec3::new(-140.0, 60.0, 70.0);

/// Directional light orbiting the origin around the Y axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sun {
    angle_degrees: f32,
}

impl Default for Sun {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Sun {
    pub fn new(angle_degrees: f32) -> Self {
        Self { angle_degrees }
    }

    pub fn angle_degrees(&self) -> f32 {
        self.angle_degrees
    }

    /// Rotate by `degrees`, wrapping into [0, 360)
    pub fn rotate(&mut self, degrees: f32) {
        self.angle_degrees = (self.angle_degrees + degrees).rem_euclid(360.0);
    }

    /// World-space sun position
    pub fn position(&self) -> Vec3 {
        Mat4::from_rotation_y(self.angle_degrees.to_radians()).transform_point3(SUN_BASE_POSITION)
    }

    /// Direction the light travels, from the sun towards the origin
    pub fn light_direction(&self) -> Vec3 {
        (Vec3::ZERO - self.position()).normalize()
    }

    /// Orthographic light-space transform used by the shadow pass
    pub fn light_space_matrix(&self, shadow: &ShadowConfig) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y);
        let s = shadow.ortho_size;
        let projection =
            Mat4::orthographic_rh(-s, s, -s, s, shadow.near_plane, shadow.far_plane);
        projection * view
    }

    /// Model transform for the small cube drawn at the sun position
    pub fn marker_transform(&self) -> Mat4 {
        Mat4::from_translation(self.position()) * Mat4::from_scale(Vec3::splat(0.25))
    }
}

/// Global light intensity and colour for day or night
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayNightLighting {
    pub brightness: f32,
    pub color: Vec3,
}

impl DayNightLighting {
    pub fn day() -> Self {
        Self {
            brightness: 1.0,
            color: Vec3::ONE,
        }
    }

    pub fn night() -> Self {
        Self {
            brightness: 0.5,
            color: Vec3::new(0.2, 0.2, 0.4),
        }
    }

    pub fn for_mode(night_mode: bool) -> Self {
        if night_mode {
            Self::night()
        } else {
            Self::day()
        }
    }
}
