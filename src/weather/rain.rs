use crate::config::RainConfig;
use crate::error::ViewerResult;
use crate::weather::particle::{DropPhase, RainDrop};
use crate::weather::random::RandomSource;

/// Summary of one simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RainUpdate {
    pub falling: usize,
    pub recycled: usize,
}

/// Fixed-capacity rain drop pool.
///
/// The pool is allocated by `initialize` and dropped by `teardown`; in
/// between its length never changes, drops that leave the floor are reset
/// in place.
pub struct RainSimulator {
    config: RainConfig,
    random: Box<dyn RandomSource>,
    drops: Vec<RainDrop>,
    initialized: bool,
}

impl RainSimulator {
    /// Create a simulator. Fails on zero capacity or malformed ranges.
    pub fn new(config: RainConfig, random: Box<dyn RandomSource>) -> ViewerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            random,
            drops: Vec::new(),
            initialized: false,
        })
    }

    /// Allocate and randomize the whole pool. Any previous state is discarded.
    pub fn initialize(&mut self) {
        let capacity = self.config.capacity;
        self.drops.clear();
        self.drops.reserve_exact(capacity);
        for _ in 0..capacity {
            let drop = RainDrop::spawn(
                &self.config,
                self.config.initial_fall_speed,
                self.random.as_mut(),
            );
            self.drops.push(drop);
        }
        self.initialized = true;
        log::debug!("[RainSimulator::initialize] Spawned {} drops", capacity);
    }

    /// Advance every drop by `dt` seconds (caller clamps `dt >= 0`)
    pub fn advance(&mut self, dt: f32) -> RainUpdate {
        let mut update = RainUpdate::default();
        if !self.initialized {
            return update;
        }

        let floor = self.config.floor;
        for drop in self.drops.iter_mut() {
            if drop.step(dt, floor) {
                *drop = RainDrop::spawn(
                    &self.config,
                    self.config.recycle_fall_speed,
                    self.random.as_mut(),
                );
                update.recycled += 1;
            } else if drop.phase == DropPhase::Falling {
                update.falling += 1;
            }
        }

        update
    }

    /// Release the pool. Safe to call when never initialized.
    pub fn teardown(&mut self) {
        if !self.initialized {
            return;
        }
        self.drops = Vec::new();
        self.initialized = false;
        log::debug!("[RainSimulator::teardown] Drop pool released");
    }

    /// Swap the random source, e.g. to re-seed before the next `initialize`
    pub fn set_random_source(&mut self, random: Box<dyn RandomSource>) {
        self.random = random;
    }

    pub fn drops(&self) -> &[RainDrop] {
        &self.drops
    }

    pub fn len(&self) -> usize {
        self.drops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drops.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn falling_count(&self) -> usize {
        self.drops.iter().filter(|d| d.is_falling()).count()
    }

    pub fn config(&self) -> &RainConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::weather::random::{seeded, SequenceSource};

    fn small_config(capacity: usize) -> RainConfig {
        RainConfig {
            capacity,
            ..RainConfig::default()
        }
    }

    #[test]
    fn test_zero_capacity_is_configuration_error() {
        let result = RainSimulator::new(small_config(0), seeded(1));
        assert!(matches!(result, Err(ViewerError::Configuration { .. })));
    }

    #[test]
    fn test_fresh_pool_distribution() {
        let mut rain = RainSimulator::new(small_config(2000), seeded(42)).unwrap();
        rain.initialize();

        assert_eq!(rain.len(), 2000);
        for drop in rain.drops() {
            assert_eq!(drop.phase, DropPhase::Waiting);
            assert_eq!(drop.position.y, 120.0);
            assert!(drop.spawn_delay >= 0.0 && drop.spawn_delay < 3.0);
            assert!(drop.position.x >= -300.0 && drop.position.x < 700.0);
            assert!(drop.position.z >= -250.0 && drop.position.z < 750.0);
            assert!(-drop.velocity.y >= 300.0 && -drop.velocity.y < 361.0);
        }
    }

    #[test]
    fn test_advance_before_initialize_is_noop() {
        let mut rain = RainSimulator::new(small_config(10), seeded(1)).unwrap();
        let update = rain.advance(1.0);
        assert_eq!(update, RainUpdate::default());
        assert!(rain.is_empty());
    }

    #[test]
    fn test_teardown_without_initialize_is_noop() {
        let mut rain = RainSimulator::new(small_config(10), seeded(1)).unwrap();
        rain.teardown();
        assert!(!rain.is_initialized());
    }

    #[test]
    fn test_advance_preserves_pool_size() {
        let mut rain = RainSimulator::new(small_config(500), seeded(3)).unwrap();
        rain.initialize();
        for _ in 0..300 {
            rain.advance(1.0 / 30.0);
            assert_eq!(rain.len(), 500);
        }
    }

    #[test]
    fn test_recycled_drops_never_below_floor() {
        let mut rain = RainSimulator::new(small_config(64), seeded(9)).unwrap();
        rain.initialize();
        let mut recycled = 0;
        for _ in 0..400 {
            let update = rain.advance(0.25);
            recycled += update.recycled;
            for drop in rain.drops() {
                assert!(drop.position.y >= -300.0);
            }
        }
        assert!(recycled > 0);
    }

    #[test]
    fn test_scripted_single_drop_lifecycle() {
        let config = RainConfig {
            capacity: 1,
            initial_fall_speed: crate::config::FloatRange::new(1.0, 1000.0),
            ..RainConfig::default()
        };
        // x, z, speed, delay for the first spawn; then the recycle draw
        let source = SequenceSource::new([0.0, 0.0, 100.0, 0.5, 50.0, 60.0, 80.0, 1.0]);
        let mut rain = RainSimulator::new(config, Box::new(source)).unwrap();
        rain.initialize();

        rain.advance(0.5);
        let drop = rain.drops()[0];
        assert_eq!(drop.phase, DropPhase::Falling);
        assert_eq!(drop.position.y, 120.0);

        rain.advance(4.0);
        assert_eq!(rain.drops()[0].position.y, -280.0);

        let update = rain.advance(0.25);
        assert_eq!(update.recycled, 1);
        let drop = rain.drops()[0];
        assert_eq!(drop.phase, DropPhase::Waiting);
        assert_eq!(drop.position.y, 120.0);
        assert_eq!(drop.position.x, 50.0);
        assert_eq!(drop.velocity.y, -80.0);
        assert_eq!(drop.spawn_delay, 1.0);
    }

    #[test]
    fn test_landing_exactly_on_floor_recycles_next_tick() {
        let config = RainConfig {
            capacity: 1,
            initial_fall_speed: crate::config::FloatRange::new(1.0, 1000.0),
            ..RainConfig::default()
        };
        let source = SequenceSource::new([0.0, 0.0, 100.0, 0.5, 50.0, 60.0, 80.0, 1.0]);
        let mut rain = RainSimulator::new(config, Box::new(source)).unwrap();
        rain.initialize();

        rain.advance(0.5);
        assert_eq!(rain.drops()[0].phase, DropPhase::Falling);
        assert_eq!(rain.drops()[0].position.y, 120.0);

        // 120 - 100 * 4.2 lands on the floor, which is not below it
        let update = rain.advance(4.2);
        assert_eq!(update.recycled, 0);
        let drop = rain.drops()[0];
        assert_eq!(drop.phase, DropPhase::Falling);
        assert!(drop.position.y >= -300.0);

        let update = rain.advance(0.1);
        assert_eq!(update.recycled, 1);
        let drop = rain.drops()[0];
        assert_eq!(drop.phase, DropPhase::Waiting);
        assert_eq!(drop.position.y, 120.0);
    }
}
