//! Output-stage dynamics compressor.
//!
//! Many voices summed together can exceed full scale. The compressor sits
//! after the master gain and pulls loud passages down before they clip.
//!
//! Feed-forward design: a peak envelope follower drives a static gain curve
//! (threshold, ratio, soft knee). Defaults follow the usual browser dynamics
//! compressor: -24 dB threshold, 30 dB knee, 12:1, 3 ms attack, 250 ms release.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Threshold in dB (-60 to 0).
    pub threshold: f32,
    /// Knee width in dB (0 = hard knee).
    pub knee: f32,
    /// Compression ratio (e.g. 4.0 = 4:1).
    pub ratio: f32,
    /// Attack time in seconds.
    pub attack: f32,
    /// Release time in seconds.
    pub release: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold: -24.0,
            knee: 30.0,
            ratio: 12.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: f32) -> Self {
        let params = CompressorParams {
            threshold: params.threshold.clamp(-60.0, 0.0),
            knee: params.knee.clamp(0.0, 40.0),
            ratio: params.ratio.clamp(1.0, 20.0),
            attack: params.attack.clamp(0.0001, 1.0),
            release: params.release.clamp(0.001, 5.0),
        };
        Self {
            attack_coef: (-1.0 / (params.attack * sample_rate)).exp(),
            release_coef: (-1.0 / (params.release * sample_rate)).exp(),
            params,
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f32) -> f32 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f32) -> f32 {
        10.0_f32.powf(db / 20.0)
    }

    /// Gain change in dB (zero or negative) for an input level in dB.
    fn gain_reduction(&self, input_db: f32) -> f32 {
        let CompressorParams {
            threshold,
            knee,
            ratio,
            ..
        } = self.params;
        let slope = 1.0 - 1.0 / ratio;

        if knee <= 0.0 {
            return if input_db <= threshold {
                0.0
            } else {
                (threshold - input_db) * slope
            };
        }

        let half_knee = knee / 2.0;
        if input_db <= threshold - half_knee {
            0.0
        } else if input_db >= threshold + half_knee {
            (threshold - input_db) * slope
        } else {
            // Quadratic blend across the knee
            let x = input_db - (threshold - half_knee);
            -slope * x * x / (2.0 * knee)
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let reduction = self.gain_reduction(Self::linear_to_db(self.envelope));
        sample * Self::db_to_linear(reduction)
    }

    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Current gain reduction in dB, positive (for metering).
    pub fn reduction_db(&self) -> f32 {
        -self.gain_reduction(Self::linear_to_db(self.envelope))
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    #[test]
    fn quiet_signal_passes_through() {
        let mut comp = Compressor::new(CompressorParams::default(), SAMPLE_RATE);
        for _ in 0..2_000 {
            comp.process(0.01); // -40 dB, below the knee
        }
        let out = comp.process(0.01);
        assert!((out - 0.01).abs() < 1e-4, "got {out}");
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new(CompressorParams::default(), SAMPLE_RATE);
        for _ in 0..5_000 {
            comp.process(1.0);
        }
        let out = comp.process(1.0);
        assert!(out < 0.25, "got {out}");
        assert!(comp.reduction_db() > 12.0);
    }

    #[test]
    fn knee_is_continuous() {
        let comp = Compressor::new(CompressorParams::default(), SAMPLE_RATE);
        let params = CompressorParams::default();
        let low = params.threshold - params.knee / 2.0;
        let high = params.threshold + params.knee / 2.0;
        assert!(comp.gain_reduction(low).abs() < 1e-4);
        let expected = (params.threshold - high) * (1.0 - 1.0 / params.ratio);
        assert!((comp.gain_reduction(high) - expected).abs() < 1e-3);
    }

    #[test]
    fn hard_knee_steps_at_threshold() {
        let params = CompressorParams {
            knee: 0.0,
            ratio: 4.0,
            threshold: -12.0,
            ..CompressorParams::default()
        };
        let comp = Compressor::new(params, SAMPLE_RATE);
        assert_eq!(comp.gain_reduction(-12.0), 0.0);
        assert!((comp.gain_reduction(0.0) + 9.0).abs() < 1e-4);
    }
}
