/// Camera Module
///
/// Free-fly camera driven by mouse look and WASD movement, plus the scripted
/// waypoint tour. Matrices are built with cgmath and handed to the rest of
/// the viewer as glam types.

pub mod tour;

pub use tour::CameraTour;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3};
use glam::{Mat4, Vec3};

/// Direction for a single camera move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Point3<f32>,
    front: Vector3<f32>,
    right: Vector3<f32>,
    world_up: Vector3<f32>,
    yaw: Deg<f32>,
    pitch: Deg<f32>,
}

fn to_point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let world_up = to_vector(up).normalize();
        let mut front = to_vector(target - position);
        if front.magnitude2() <= f32::EPSILON {
            front = Vector3::new(0.0, 0.0, -1.0);
        }
        let front = front.normalize();
        let right = front.cross(world_up).normalize();

        Self {
            position: to_point(position),
            front,
            right,
            world_up,
            yaw: Deg(-90.0),
            pitch: Deg(0.0),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let view = Matrix4::look_at_rh(self.position, self.position + self.front, self.world_up);
        let cols: [[f32; 4]; 4] = view.into();
        Mat4::from_cols_array_2d(&cols)
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position.x, self.position.y, self.position.z)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = to_point(position);
    }

    pub fn front(&self) -> Vec3 {
        Vec3::new(self.front.x, self.front.y, self.front.z)
    }

    /// Point the camera using absolute angles in degrees
    pub fn rotate(&mut self, pitch: f32, yaw: f32) {
        let (sin_yaw, cos_yaw) = yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = pitch.to_radians().sin_cos();

        self.front = Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.yaw = Deg(yaw);
        self.pitch = Deg(pitch);
    }

    /// Apply a mouse delta (already scaled by sensitivity). Pitch is clamped
    /// to keep the view from flipping.
    pub fn look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        let yaw = self.yaw.0 + delta_yaw;
        let pitch = (self.pitch.0 + delta_pitch).clamp(-89.0, 89.0);
        self.rotate(pitch, yaw);
    }

    pub fn move_in(&mut self, direction: MoveDirection, speed: f32) {
        match direction {
            MoveDirection::Forward => self.position += self.front * speed,
            MoveDirection::Backward => self.position -= self.front * speed,
            MoveDirection::Left => self.position -= self.right * speed,
            MoveDirection::Right => self.position += self.right * speed,
        }
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw.0
    }

    pub fn pitch_degrees(&self) -> f32 {
        self.pitch.0
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fov_degrees: f32, znear: f32, zfar: f32) -> Self {
        Self {
            fov_degrees,
            aspect: width.max(1) as f32 / height.max(1) as f32,
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Right-handed perspective with a [0, 1] depth range
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_view_matrix_maps_position_to_origin() {
        let camera = Camera::new(Vec3::new(0.0, 40.0, 5.5), Vec3::ZERO, Vec3::Y);
        let eye = camera.view_matrix().transform_point3(camera.position());
        assert!(approx(eye, Vec3::ZERO));
    }

    #[test]
    fn test_rotate_sets_front() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        camera.rotate(0.0, 0.0);
        assert!(approx(camera.front(), Vec3::X));
        camera.rotate(0.0, -90.0);
        assert!(approx(camera.front(), Vec3::NEG_Z));
    }

    #[test]
    fn test_move_directions() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        camera.move_in(MoveDirection::Forward, 2.0);
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, -2.0)));
        camera.move_in(MoveDirection::Right, 1.0);
        assert!(approx(camera.position(), Vec3::new(1.0, 0.0, -2.0)));
        camera.move_in(MoveDirection::Left, 1.0);
        camera.move_in(MoveDirection::Backward, 2.0);
        assert!(approx(camera.position(), Vec3::ZERO));
    }

    #[test]
    fn test_look_clamps_pitch() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        camera.look(0.0, 500.0);
        assert_eq!(camera.pitch_degrees(), 89.0);
        camera.look(0.0, -500.0);
        assert_eq!(camera.pitch_degrees(), -89.0);
    }

    #[test]
    fn test_projection_aspect_follows_resize() {
        let mut projection = Projection::new(1280, 720, 45.0, 0.1, 1000.0);
        projection.resize(800, 800);
        assert_eq!(projection.aspect, 1.0);
    }
}
