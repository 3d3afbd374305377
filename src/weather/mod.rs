/// Weather module - rain drops, the thunder timer and fog parameters.
/// Pure simulation state; nothing in here talks to the GPU.

pub mod fog;
pub mod particle;
pub mod rain;
pub mod random;
pub mod thunder;

pub use fog::FogSettings;
pub use particle::{DropPhase, RainDrop};
pub use rain::{RainSimulator, RainUpdate};
pub use random::{RandomSource, SequenceSource};
pub use thunder::{ThunderPhase, ThunderSignal, ThunderTimer};
