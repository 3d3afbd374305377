use glam::{Mat4, Vec3};

/// Number of point lights the scene shader is compiled for
pub const MAX_POINT_LIGHTS: usize = 4;

pub const LAMP_POSITIONS: [Vec3; MAX_POINT_LIGHTS] = [
    Vec3::new(-111.0, 11.0, 15.0),
    Vec3::new(-25.0, 14.66, -3.0),
    Vec3::new(15.1, 12.7, -57.5),
    Vec3::new(75.24, 14.8, -2.65),
];

/// Distance attenuation terms: `1 / (constant + linear d + quadratic d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// The street lamps placed around the scene
#[derive(Debug, Clone, PartialEq)]
pub struct PointLightSet {
    pub positions: [Vec3; MAX_POINT_LIGHTS],
    pub color: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub attenuation: Attenuation,
}

impl Default for PointLightSet {
    fn default() -> Self {
        Self {
            positions: LAMP_POSITIONS,
            color: Vec3::new(1.0, 0.9, 0.7),
            ambient: 0.2,
            diffuse: 1.0,
            specular: 1.0,
            attenuation: Attenuation {
                constant: 1.0,
                linear: 0.02,
                quadratic: 0.001,
            },
        }
    }
}

impl PointLightSet {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Light positions transformed into eye space by `view`
    pub fn eye_positions(&self, view: &Mat4) -> [Vec3; MAX_POINT_LIGHTS] {
        self.positions.map(|p| view.transform_point3(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_view_keeps_positions() {
        let lights = PointLightSet::default();
        assert_eq!(lights.eye_positions(&Mat4::IDENTITY), LAMP_POSITIONS);
    }

    #[test]
    fn test_eye_positions_follow_view() {
        let lights = PointLightSet::default();
        let view = Mat4::from_translation(Vec3::new(0.0, -10.0, 0.0));
        let eye = lights.eye_positions(&view);
        assert!((eye[0] - Vec3::new(-111.0, 1.0, 15.0)).length() < 1e-4);
    }

    #[test]
    fn test_attenuation_falls_off() {
        let att = PointLightSet::default().attenuation;
        assert_eq!(att.factor(0.0), 1.0);
        assert!(att.factor(10.0) < att.factor(1.0));
    }
}
