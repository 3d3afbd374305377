use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::{FloatRange, RainConfig};
use crate::weather::random::RandomSource;

/// Lifecycle phase of a single drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPhase {
    /// Parked at its spawn point, counting down `spawn_delay`
    Waiting,
    /// Integrating its velocity every tick
    Falling,
}

/// One simulated rain drop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainDrop {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left before the drop starts falling
    pub spawn_delay: f32,
    pub phase: DropPhase,
}

impl RainDrop {
    /// Sample a fresh waiting drop. Draw order: x, z, fall speed, delay.
    pub fn spawn(config: &RainConfig, fall_speed: FloatRange, random: &mut dyn RandomSource) -> Self {
        let position = Vec3::new(
            random.sample(config.spawn_x),
            config.spawn_height,
            random.sample(config.spawn_z),
        );
        let speed = random.sample(fall_speed);
        let spawn_delay = random.sample(config.spawn_delay);

        Self {
            position,
            velocity: Vec3::new(0.0, -speed, 0.0),
            spawn_delay,
            phase: DropPhase::Waiting,
        }
    }

    pub fn is_falling(&self) -> bool {
        self.phase == DropPhase::Falling
    }

    /// Advance one tick. Returns true when the drop crossed `floor` and has to
    /// be recycled by the caller.
    pub fn step(&mut self, dt: f32, floor: f32) -> bool {
        match self.phase {
            DropPhase::Waiting => {
                self.spawn_delay -= dt;
                if self.spawn_delay <= 0.0 {
                    self.phase = DropPhase::Falling;
                }
                false
            }
            DropPhase::Falling => {
                self.position += self.velocity * dt;
                self.position.y < floor
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::random::SequenceSource;

    fn scripted_drop(delay: f32, speed: f32) -> RainDrop {
        let config = RainConfig::default();
        let mut source = SequenceSource::new([10.0, 20.0, speed, delay]);
        RainDrop::spawn(&config, FloatRange::new(0.0, 1000.0), &mut source)
    }

    #[test]
    fn test_spawn_uses_draw_order() {
        let drop = scripted_drop(0.5, 100.0);
        assert_eq!(drop.position, Vec3::new(10.0, 120.0, 20.0));
        assert_eq!(drop.velocity, Vec3::new(0.0, -100.0, 0.0));
        assert_eq!(drop.spawn_delay, 0.5);
        assert_eq!(drop.phase, DropPhase::Waiting);
    }

    #[test]
    fn test_transition_tick_does_not_move() {
        let mut drop = scripted_drop(0.5, 100.0);
        assert!(!drop.step(0.5, -300.0));
        assert!(drop.is_falling());
        assert_eq!(drop.position.y, 120.0);
    }

    #[test]
    fn test_waiting_counts_down() {
        let mut drop = scripted_drop(2.0, 100.0);
        drop.step(0.5, -300.0);
        assert_eq!(drop.phase, DropPhase::Waiting);
        assert!((drop.spawn_delay - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_falling_reports_floor_crossing() {
        let mut drop = scripted_drop(0.0, 100.0);
        drop.step(0.0, -300.0);
        assert!(drop.is_falling());
        assert!(!drop.step(1.0, -300.0));
        assert_eq!(drop.position.y, 20.0);
        assert!(drop.step(4.0, -300.0));
    }
}
