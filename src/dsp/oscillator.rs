use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
}

impl OscillatorWaveform {
    /// One cycle, `phase` in [0, 1).
    #[inline]
    fn sample(self, phase: f32) -> f32 {
        match self {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Saw => 2.0 * phase - 1.0,
        }
    }
}

/// Phase-accumulating tone source at a fixed frequency.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: OscillatorWaveform,
    frequency: f32,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: OscillatorWaveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            phase: 0.0,
        }
    }

    #[inline]
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase += self.frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        out
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}
