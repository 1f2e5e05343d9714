//! Pitch to frequency lookup.
//!
//! Equal temperament, A4 = 440 Hz:
//!
//! ```text
//! frequency = 440 * 2^((n - 69) / 12)      n = semitone number (A4 = 69)
//! ```
//!
//! A table only answers for its usable range; anything outside has no
//! frequency and is not sounded.

use super::pitch::{NoteName, Pitch};

#[inline]
fn semitone_to_freq(number: i32) -> f32 {
    440.0 * 2.0_f32.powf((number as f32 - 69.0) / 12.0)
}

/// Read-only mapping from [`Pitch`] to Hz over an inclusive pitch range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyTable {
    lowest: Pitch,
    highest: Pitch,
}

/// C0 (16.35 Hz) through B8 (7902 Hz).
pub static STANDARD: FrequencyTable = FrequencyTable {
    lowest: Pitch::new(NoteName::C, 0),
    highest: Pitch::new(NoteName::B, 8),
};

impl FrequencyTable {
    /// A table covering `lowest..=highest`. The bounds are swapped if given
    /// in the wrong order.
    pub fn new(lowest: Pitch, highest: Pitch) -> Self {
        if lowest <= highest {
            Self { lowest, highest }
        } else {
            Self {
                lowest: highest,
                highest: lowest,
            }
        }
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.lowest <= pitch && pitch <= self.highest
    }

    /// Frequency in Hz, or `None` when the pitch is outside the table.
    pub fn frequency(&self, pitch: Pitch) -> Option<f32> {
        self.contains(pitch)
            .then(|| semitone_to_freq(pitch.semitone_number()))
    }

    pub fn lowest(&self) -> Pitch {
        self.lowest
    }

    pub fn highest(&self) -> Pitch {
        self.highest
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        STANDARD
    }
}
