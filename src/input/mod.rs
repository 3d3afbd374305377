use std::collections::HashSet;

use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

use crate::camera::MoveDirection;
use crate::scene::SceneToggle;

/// One-shot action bound to a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Toggle(SceneToggle),
    StartTour,
    Exit,
}

/// Key bindings for the one-shot actions
pub fn action_for_key(key: KeyCode) -> Option<KeyAction> {
    let action = match key {
        KeyCode::KeyM => KeyAction::Toggle(SceneToggle::DepthMap),
        KeyCode::KeyP => KeyAction::Toggle(SceneToggle::PointLights),
        KeyCode::KeyH => KeyAction::Toggle(SceneToggle::HelicopterRotation),
        KeyCode::KeyF => KeyAction::Toggle(SceneToggle::Fog),
        KeyCode::KeyG => KeyAction::Toggle(SceneToggle::Wind),
        KeyCode::KeyR => KeyAction::Toggle(SceneToggle::Rain),
        KeyCode::KeyN => KeyAction::Toggle(SceneToggle::NightMode),
        KeyCode::KeyC => KeyAction::StartTour,
        KeyCode::Escape => KeyAction::Exit,
        _ => return None,
    };
    Some(action)
}

const MOVE_BINDINGS: [(KeyCode, MoveDirection); 4] = [
    (KeyCode::KeyW, MoveDirection::Forward),
    (KeyCode::KeyS, MoveDirection::Backward),
    (KeyCode::KeyA, MoveDirection::Left),
    (KeyCode::KeyD, MoveDirection::Right),
];

/// Held keys and accumulated mouse motion between frames
#[derive(Debug, Default)]
pub struct InputState {
    keys_pressed: HashSet<KeyCode>,
    mouse_delta: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key event. Returns true only for the press that starts a
    /// hold, so auto-repeat does not re-trigger toggles.
    pub fn process_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        match state {
            ElementState::Pressed => self.keys_pressed.insert(key),
            ElementState::Released => {
                self.keys_pressed.remove(&key);
                false
            }
        }
    }

    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.mouse_delta.0 += delta.0 as f32;
        self.mouse_delta.1 += delta.1 as f32;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Directions whose keys are currently held
    pub fn held_moves(&self) -> impl Iterator<Item = MoveDirection> + '_ {
        MOVE_BINDINGS
            .iter()
            .filter(|(key, _)| self.keys_pressed.contains(key))
            .map(|(_, direction)| *direction)
    }

    /// Sun rotation in degrees requested this frame (J/L)
    pub fn sun_rotation(&self) -> f32 {
        let mut degrees = 0.0;
        if self.is_key_pressed(KeyCode::KeyJ) {
            degrees -= 1.0;
        }
        if self.is_key_pressed(KeyCode::KeyL) {
            degrees += 1.0;
        }
        degrees
    }

    pub fn is_boosting(&self) -> bool {
        self.is_key_pressed(KeyCode::Space)
    }

    /// Mouse motion since the last call
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    pub fn clear(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_press_is_not_new() {
        let mut input = InputState::new();
        assert!(input.process_key(KeyCode::KeyR, ElementState::Pressed));
        assert!(!input.process_key(KeyCode::KeyR, ElementState::Pressed));
        input.process_key(KeyCode::KeyR, ElementState::Released);
        assert!(input.process_key(KeyCode::KeyR, ElementState::Pressed));
    }

    #[test]
    fn test_held_moves() {
        let mut input = InputState::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        input.process_key(KeyCode::KeyD, ElementState::Pressed);
        let moves: Vec<_> = input.held_moves().collect();
        assert_eq!(moves, vec![MoveDirection::Forward, MoveDirection::Right]);
    }

    #[test]
    fn test_mouse_delta_is_consumed() {
        let mut input = InputState::new();
        input.process_mouse_motion((3.0, -2.0));
        input.process_mouse_motion((1.0, 1.0));
        assert_eq!(input.take_mouse_delta(), (4.0, -1.0));
        assert_eq!(input.take_mouse_delta(), (0.0, 0.0));
    }

    #[test]
    fn test_bindings() {
        assert_eq!(
            action_for_key(KeyCode::KeyR),
            Some(KeyAction::Toggle(SceneToggle::Rain))
        );
        assert_eq!(action_for_key(KeyCode::KeyC), Some(KeyAction::StartTour));
        assert_eq!(action_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn test_sun_rotation_keys() {
        let mut input = InputState::new();
        input.process_key(KeyCode::KeyJ, ElementState::Pressed);
        assert_eq!(input.sun_rotation(), -1.0);
        input.process_key(KeyCode::KeyL, ElementState::Pressed);
        assert_eq!(input.sun_rotation(), 0.0);
    }
}
