use crate::synth::backend::{Curve, Ramp};

/*
Gain Automation
===============

This module implements the per-voice amplitude stage: a gain value that moves
along scheduled ramps on the audio clock. It is what turns a raw oscillator
into a note that fades in and out instead of switching on and off.

Vocabulary
----------

  value       The stage's current gain. Multiplies the tone feeding it.

  ramp        A scheduled transition: reach `target` at time `end`, starting
              from whatever the value is at time `start`.

  segment     The ramp currently in effect, with its starting value captured.
              There is at most one.

  floor       The near-silent gain voices start from and decay to. Never 0.0,
              see below.


Why Not Just Switch?
--------------------

Jumping the gain from 0.0 to 1.0 between two samples puts a step into the
waveform, and a step contains energy at every frequency. You hear it as a
click or "pop". The fix is to spread the change over a few hundred
milliseconds.


The Shape: Exponential Ramps
----------------------------

  Gain
    1.0 ┐           ________
        │          ╱        ╲
        │         ╱          ╲
        │       _╱            ╲_
    ε   └──────╯                ╲_________→ Time
              attack    hold    release

Hearing is logarithmic, so a ramp that changes gain by a constant RATIO per
unit of time sounds even, where a straight line sounds like it jumps at the
quiet end and stalls at the loud end.

    value(p) = from × (to / from)^p          p = (t - start) / (end - start)

At p = 0 this is `from`, at p = 1 it is `to`, and every equal step in p
multiplies the gain by the same factor. The catch: the ratio `to / from` is
meaningless when either end is zero, which is why silence is represented by a
small floor (1e-4, i.e. -80 dB) instead of 0.0. If an exponential ramp is
asked to start or end at zero anyway, it falls back to a straight line.


Superseding
-----------

Scheduling a new ramp replaces the segment in effect. The new segment starts
from the value the stage holds at that moment, so a release interrupted by a
re-attack turns around smoothly from wherever it got to:

    1.0 ┐ ____
        │     ╲        ____
        │      ╲     ╱
        │       ╲__╱   ← re-attack from the current value, no jump
        └──────────────────→ Time
*/

#[derive(Debug, Clone, Copy)]
struct Segment {
    from: f32,
    to: f32,
    start: f64,
    end: f64,
    curve: Curve,
}

impl Segment {
    fn value_at(&self, progress: f32) -> f32 {
        let exponential_ok = self.from > 0.0 && self.to > 0.0;
        match self.curve {
            Curve::Exponential if exponential_ok => {
                self.from * (self.to / self.from).powf(progress)
            }
            _ => self.from + (self.to - self.from) * progress,
        }
    }
}

/// A gain that follows scheduled ramps on the audio clock.
#[derive(Debug, Clone)]
pub struct GainParam {
    value: f32,
    segment: Option<Segment>,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            segment: None,
        }
    }

    /// Replace any pending automation with `ramp`.
    ///
    /// A ramp that should already have started begins at `now` instead, so
    /// the transition is never cut short into a jump.
    pub fn schedule(&mut self, ramp: Ramp, now: f64) {
        let start = ramp.start.max(now);
        let end = start + ramp.duration().max(0.0);
        self.segment = Some(Segment {
            from: self.value,
            to: ramp.target,
            start,
            end,
            curve: ramp.curve,
        });
    }

    /// Advance to time `t` (seconds) and return the gain there.
    pub fn value_at(&mut self, t: f64) -> f32 {
        if let Some(segment) = self.segment {
            if t >= segment.end {
                self.value = segment.to;
                self.segment = None;
            } else if t >= segment.start {
                let progress = ((t - segment.start) / (segment.end - segment.start)) as f32;
                self.value = segment.value_at(progress);
            }
        }
        self.value
    }

    /// Render one gain value per sample, the first at `start_time`.
    pub fn render(&mut self, buffer: &mut [f32], start_time: f64, sample_rate: f32) {
        let dt = 1.0 / sample_rate as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample = self.value_at(start_time + i as f64 * dt);
        }
    }

    /// Get the current gain
    pub fn value(&self) -> f32 {
        self.value
    }

    /// True while a ramp is pending or in progress.
    pub fn is_ramping(&self) -> bool {
        self.segment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    #[test]
    fn attack_reaches_target_at_end() {
        let mut gain = GainParam::new(1e-4);
        gain.schedule(Ramp::exponential(1.0, 0.0, 0.2), 0.0);

        assert!((gain.value_at(0.0) - 1e-4).abs() < 1e-7);
        assert!(gain.value_at(0.1) < 0.5, "exponential rise is slow at first");
        assert_eq!(gain.value_at(0.2), 1.0);
        assert!(!gain.is_ramping());
    }

    #[test]
    fn exponential_midpoint_is_geometric_mean() {
        let mut gain = GainParam::new(0.01);
        gain.schedule(Ramp::exponential(1.0, 0.0, 1.0), 0.0);
        assert!((gain.value_at(0.5) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn ramp_is_monotonic() {
        let mut gain = GainParam::new(1.0);
        gain.schedule(Ramp::exponential(1e-4, 0.0, 0.15), 0.0);

        let mut buffer = vec![0.0; 200];
        gain.render(&mut buffer, 0.0, SAMPLE_RATE);
        assert!(buffer.windows(2).all(|w| w[1] <= w[0]));
        assert!(buffer[199] <= 1e-4 + 1e-9);
        assert!(buffer.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn future_ramp_holds_until_start() {
        let mut gain = GainParam::new(0.5);
        gain.schedule(Ramp::linear(1.0, 1.0, 1.0), 0.0);
        assert_eq!(gain.value_at(0.5), 0.5);
        assert!((gain.value_at(1.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn new_ramp_supersedes_from_current_value() {
        let mut gain = GainParam::new(1.0);
        gain.schedule(Ramp::linear(0.0, 0.0, 1.0), 0.0);
        let halfway = gain.value_at(0.5);
        assert!((halfway - 0.5).abs() < 1e-6);

        gain.schedule(Ramp::linear(1.0, 0.5, 0.5), 0.5);
        // No jump at the handover.
        assert!((gain.value_at(0.5) - halfway).abs() < 1e-6);
        assert!((gain.value_at(0.75) - 0.75).abs() < 1e-6);
        assert_eq!(gain.value_at(1.0), 1.0);
    }

    #[test]
    fn late_ramp_starts_now() {
        let mut gain = GainParam::new(0.0);
        gain.schedule(Ramp::linear(1.0, 0.0, 1.0), 10.0);
        assert_eq!(gain.value_at(10.0), 0.0);
        assert!((gain.value_at(10.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn exponential_from_zero_falls_back_to_linear() {
        let mut gain = GainParam::new(0.0);
        gain.schedule(Ramp::exponential(1.0, 0.0, 1.0), 0.0);
        assert!((gain.value_at(0.5) - 0.5).abs() < 1e-6);
    }
}
