use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::FogConfig;

/// Fog parameters published to the scene shader
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    pub density: f32,
    pub color: Vec4,
}

impl FogSettings {
    pub fn from_config(config: &FogConfig) -> Self {
        Self {
            density: config.density,
            color: config.color,
        }
    }

    /// Thick grey fog for storms
    pub fn storm() -> Self {
        Self {
            density: 0.035,
            color: Vec4::new(0.4, 0.4, 0.45, 1.0),
        }
    }

    /// Visibility factor at `distance` (1 = clear, 0 = fully fogged).
    /// Squared exponential falloff, same as the scene shader.
    pub fn visibility(&self, distance: f32) -> f32 {
        let d = self.density * distance.max(0.0);
        (-(d * d)).exp().clamp(0.0, 1.0)
    }

    /// Blend a lit colour towards the fog colour
    pub fn apply(&self, color: Vec3, distance: f32) -> Vec3 {
        let visibility = self.visibility(distance);
        self.color.truncate().lerp(color, visibility)
    }

    /// Interpolate between two fog settings
    pub fn interpolate(&self, other: &FogSettings, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            density: self.density + (other.density - self.density) * t,
            color: self.color.lerp(other.color, t),
        }
    }
}

impl Default for FogSettings {
    fn default() -> Self {
        Self::from_config(&FogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_falls_with_distance() {
        let fog = FogSettings::default();
        assert_eq!(fog.visibility(0.0), 1.0);
        assert!(fog.visibility(10.0) > fog.visibility(50.0));
        assert!(fog.visibility(500.0) < 1e-3);
    }

    #[test]
    fn test_apply_blends_towards_fog_color() {
        let fog = FogSettings::default();
        let far = fog.apply(Vec3::ONE, 1000.0);
        assert!((far - Vec3::splat(0.5)).length() < 1e-3);
        assert_eq!(fog.apply(Vec3::ONE, 0.0), Vec3::ONE);
    }

    #[test]
    fn test_interpolate_clamps() {
        let clear = FogSettings::default();
        let storm = FogSettings::storm();
        let high = clear.interpolate(&storm, 2.0);
        assert!((high.density - storm.density).abs() < 1e-6);
        assert!((high.color - storm.color).length() < 1e-6);
        assert_eq!(clear.interpolate(&storm, -1.0), clear);
    }
}
