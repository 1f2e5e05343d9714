#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Attack/release shape shared by every voice.
///
/// Gains never reach exactly zero: exponential ramps are undefined there, so
/// silence is represented by `floor`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    /// Seconds from silence to `peak`.
    pub attack: f64,
    /// Seconds from the current level down to `floor`.
    pub release: f64,
    /// Per-voice gain once the attack completes.
    pub peak: f32,
    /// Near-silence level voices start from and decay to.
    pub floor: f32,
}

impl EnvelopeConfig {
    pub const DEFAULT_ATTACK: f64 = 0.2;
    pub const DEFAULT_RELEASE: f64 = 0.15;
    pub const DEFAULT_FLOOR: f32 = 1e-4;

    pub fn attack(mut self, seconds: f64) -> Self {
        self.attack = seconds.max(0.0);
        self
    }

    pub fn release(mut self, seconds: f64) -> Self {
        self.release = seconds.max(0.0);
        self
    }

    pub fn peak(mut self, gain: f32) -> Self {
        self.peak = gain.max(self.floor);
        self
    }

    pub fn floor(mut self, gain: f32) -> Self {
        self.floor = gain.max(f32::MIN_POSITIVE);
        self
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: Self::DEFAULT_ATTACK,
            release: Self::DEFAULT_RELEASE,
            peak: 1.0,
            floor: Self::DEFAULT_FLOOR,
        }
    }
}
