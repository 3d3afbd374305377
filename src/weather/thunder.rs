use crate::config::ThunderConfig;
use crate::weather::random::RandomSource;

/// Thunder timer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThunderPhase {
    Idle,
    Active,
}

/// Output of one timer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThunderSignal {
    pub phase: ThunderPhase,
    /// Scene light multiplier, baseline when idle
    pub brightness: f32,
    /// Fire the thunder clip this frame. Raised once per flash.
    pub trigger_audio: bool,
}

/// Drives the intermittent lightning flash while rain is on.
///
/// `elapsed` only advances through `tick`; the next flash is scheduled
/// relative to the moment the previous one started.
pub struct ThunderTimer {
    config: ThunderConfig,
    random: Box<dyn RandomSource>,
    phase: ThunderPhase,
    elapsed: f32,
    next_threshold: f32,
    active_start: f32,
    brightness: f32,
    sound_triggered: bool,
}

impl ThunderTimer {
    pub fn new(config: ThunderConfig, random: Box<dyn RandomSource>) -> Self {
        let next_threshold = config.first_threshold;
        let brightness = config.baseline_brightness;
        Self {
            config,
            random,
            phase: ThunderPhase::Idle,
            elapsed: 0.0,
            next_threshold,
            active_start: 0.0,
            brightness,
            sound_triggered: false,
        }
    }

    /// Advance the timer. No transitions happen while `weather_enabled` is
    /// false; time still accumulates.
    pub fn tick(&mut self, dt: f32, weather_enabled: bool) -> ThunderSignal {
        self.elapsed += dt;
        let mut trigger_audio = false;

        if weather_enabled {
            if self.phase == ThunderPhase::Idle && self.elapsed >= self.next_threshold {
                self.phase = ThunderPhase::Active;
                self.active_start = self.elapsed;
                self.sound_triggered = false;
                let interval = self.random.sample(self.config.interval);
                self.next_threshold = self.elapsed + interval;
                log::debug!(
                    "[ThunderTimer::tick] Flash at {:.2}s, next in {:.2}s",
                    self.elapsed,
                    interval
                );
            }

            if self.phase == ThunderPhase::Active {
                if self.elapsed - self.active_start <= self.config.duration {
                    self.brightness = self.config.flash_brightness;
                    if !self.sound_triggered {
                        self.sound_triggered = true;
                        trigger_audio = true;
                    }
                } else {
                    self.phase = ThunderPhase::Idle;
                    self.brightness = self.config.baseline_brightness;
                }
            }
        }

        ThunderSignal {
            phase: self.phase,
            brightness: self.brightness,
            trigger_audio,
        }
    }

    /// Drop any running flash and return to baseline. The schedule and the
    /// elapsed clock start over as well.
    pub fn reset(&mut self) {
        self.phase = ThunderPhase::Idle;
        self.brightness = self.config.baseline_brightness;
        self.elapsed = 0.0;
        self.active_start = 0.0;
        self.next_threshold = self.config.first_threshold;
        self.sound_triggered = false;
    }

    pub fn phase(&self) -> ThunderPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == ThunderPhase::Active
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn next_threshold(&self) -> f32 {
        self.next_threshold
    }
}
