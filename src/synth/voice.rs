use crate::keyboard::Pitch;

use super::backend::{SourceId, StageId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceState {
    Sounding,                // Attacking or holding at peak
    Releasing { until: f64 }, // Decaying, freed once the clock reaches `until`
}

/// One live tone source and the amplitude stage shaping it.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pitch: Pitch,
    frequency: f32,
    source: SourceId,
    stage: StageId,
    state: VoiceState,
    started_at: f64,
}

impl Voice {
    pub fn new(pitch: Pitch, frequency: f32, source: SourceId, stage: StageId, now: f64) -> Self {
        Self {
            pitch,
            frequency,
            source,
            stage,
            state: VoiceState::Sounding,
            started_at: now,
        }
    }

    /// Enter the release phase. Returns false if already releasing.
    pub fn release(&mut self, until: f64) -> bool {
        if self.state == VoiceState::Sounding {
            self.state = VoiceState::Releasing { until };
            true
        } else {
            false
        }
    }

    /// Leave the release phase, dropping the pending stop. Returns false if
    /// the voice was not releasing.
    pub fn revive(&mut self) -> bool {
        if self.is_releasing() {
            self.state = VoiceState::Sounding;
            true
        } else {
            false
        }
    }

    /// True once a release has run to completion at `now`.
    pub fn is_finished(&self, now: f64) -> bool {
        matches!(self.state, VoiceState::Releasing { until } if until <= now)
    }

    pub fn is_releasing(&self) -> bool {
        matches!(self.state, VoiceState::Releasing { .. })
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }
}
