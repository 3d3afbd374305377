use glam::{Mat4, Vec3};

pub const HELICOPTER_ANCHOR: Vec3 = Vec3::new(-102.0, 65.6, 7.8);
const HELICOPTER_SCALE: f32 = 5.0;
/// Degrees of rotation per second of accumulated time
const ROTATION_RATE: f32 = 0.3;

/// Rotating helicopter hovering over the town.
///
/// The accumulated time grows every frame, rotating or not. While rotation
/// is on the angle advances by `ROTATION_RATE` times that accumulated time,
/// so the spin is faster the longer the viewer has been running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HelicopterState {
    angle_degrees: f32,
    accumulated: f32,
}

impl HelicopterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, dt: f32, rotating: bool) {
        self.accumulated += dt;
        if !rotating {
            return;
        }
        self.angle_degrees = (self.angle_degrees + ROTATION_RATE * self.accumulated).rem_euclid(360.0);
    }

    pub fn angle_degrees(&self) -> f32 {
        self.angle_degrees
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(HELICOPTER_ANCHOR)
            * Mat4::from_rotation_y(self.angle_degrees.to_radians())
            * Mat4::from_scale(Vec3::splat(HELICOPTER_SCALE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_without_rotation() {
        let mut heli = HelicopterState::new();
        heli.update(1.0, false);
        assert_eq!(heli.angle_degrees(), 0.0);
    }

    #[test]
    fn test_angle_uses_accumulated_time() {
        let mut heli = HelicopterState::new();
        heli.update(1.0, true);
        assert!((heli.angle_degrees() - 0.3).abs() < 1e-6);
        heli.update(1.0, true);
        assert!((heli.angle_degrees() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_clock_runs_while_stationary() {
        let mut heli = HelicopterState::new();
        heli.update(2.0, false);
        assert_eq!(heli.angle_degrees(), 0.0);
        heli.update(1.0, true);
        assert!((heli.angle_degrees() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_transform_places_anchor() {
        let heli = HelicopterState::new();
        let origin = heli.transform().transform_point3(Vec3::ZERO);
        assert!((origin - HELICOPTER_ANCHOR).length() < 1e-4);
        let tip = heli.transform().transform_point3(Vec3::X);
        assert!((tip - HELICOPTER_ANCHOR - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }
}
