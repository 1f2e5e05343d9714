//! The capability interface the voice manager drives.
//!
//! A backend owns the actual signal sources, the amplitude stages and the
//! shared output stage they sum into. The voice manager only ever talks to it
//! through this trait, so it can be exercised against a recording fake as
//! easily as against the realtime engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to a tone source (an oscillator tuned to one frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

/// Handle to an amplitude stage (a controllable gain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub u32);

/// Shape of a gain transition.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// Straight line between the two values.
    Linear,
    /// Constant ratio per unit time. Both ends must be above zero.
    Exponential,
}

/// A scheduled gain transition on an amplitude stage.
///
/// The ramp starts from whatever value the stage holds at `start` and reaches
/// `target` at `end`. Scheduling a ramp supersedes any automation still
/// pending on that stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub target: f32,
    pub start: f64,
    pub end: f64,
    pub curve: Curve,
}

impl Ramp {
    pub fn exponential(target: f32, start: f64, duration: f64) -> Self {
        Self {
            target,
            start,
            end: start + duration.max(0.0),
            curve: Curve::Exponential,
        }
    }

    pub fn linear(target: f32, start: f64, duration: f64) -> Self {
        Self {
            target,
            start,
            end: start + duration.max(0.0),
            curve: Curve::Linear,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Create, wire, automate and free voice resources against an audio clock.
pub trait VoiceBackend {
    /// Current time of the audio clock in seconds. Monotonic.
    fn now(&self) -> f64;

    /// Start a tone source at `frequency` Hz. `None` when the backend has no
    /// room for another source.
    fn create_source(&mut self, frequency: f32) -> Option<SourceId>;

    /// Create an amplitude stage holding `gain`. `None` when the backend has
    /// no room for another stage.
    fn create_stage(&mut self, gain: f32) -> Option<StageId>;

    /// Feed a source into a stage.
    fn connect(&mut self, source: SourceId, stage: StageId);

    /// Route a stage into the shared output stage.
    fn connect_output(&mut self, stage: StageId);

    /// Schedule a gain transition on a stage.
    fn schedule_ramp(&mut self, stage: StageId, ramp: Ramp);

    /// Silence a source and its stage once the clock reaches `at`. The ids
    /// stay allocated until [`stop_source`](Self::stop_source) and
    /// [`remove_stage`](Self::remove_stage) free them.
    fn schedule_stop(&mut self, source: SourceId, stage: StageId, at: f64);

    /// Drop a stop scheduled for this pair. A stop that already took effect
    /// is undone, so the pair keeps sounding.
    fn cancel_stop(&mut self, source: SourceId, stage: StageId);

    /// Stop a source and free it. The id may be handed out again afterwards.
    fn stop_source(&mut self, source: SourceId);

    /// Disconnect a stage from the output and free it.
    fn remove_stage(&mut self, stage: StageId);
}

impl<B: VoiceBackend + ?Sized> VoiceBackend for &mut B {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn create_source(&mut self, frequency: f32) -> Option<SourceId> {
        (**self).create_source(frequency)
    }

    fn create_stage(&mut self, gain: f32) -> Option<StageId> {
        (**self).create_stage(gain)
    }

    fn connect(&mut self, source: SourceId, stage: StageId) {
        (**self).connect(source, stage)
    }

    fn connect_output(&mut self, stage: StageId) {
        (**self).connect_output(stage)
    }

    fn schedule_ramp(&mut self, stage: StageId, ramp: Ramp) {
        (**self).schedule_ramp(stage, ramp)
    }

    fn schedule_stop(&mut self, source: SourceId, stage: StageId, at: f64) {
        (**self).schedule_stop(source, stage, at)
    }

    fn cancel_stop(&mut self, source: SourceId, stage: StageId) {
        (**self).cancel_stop(source, stage)
    }

    fn stop_source(&mut self, source: SourceId) {
        (**self).stop_source(source)
    }

    fn remove_stage(&mut self, stage: StageId) {
        (**self).remove_stage(stage)
    }
}
