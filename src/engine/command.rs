use rtrb::Consumer;

use crate::synth::backend::{Ramp, SourceId, StageId};

/// Control-thread to audio-thread instructions, one per backend call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EngineCommand {
    CreateSource { source: SourceId, frequency: f32 },
    CreateStage { stage: StageId, gain: f32 },
    Connect { source: SourceId, stage: StageId },
    ConnectOutput { stage: StageId },
    Ramp { stage: StageId, ramp: Ramp },
    StopAt { source: SourceId, stage: StageId, at: f64 },
    CancelStop { source: SourceId, stage: StageId },
    StopSource { source: SourceId },
    RemoveStage { stage: StageId },
}

impl EngineCommand {
    /// The source slot this command touches, if any.
    pub fn source(&self) -> Option<SourceId> {
        match *self {
            Self::CreateSource { source, .. }
            | Self::Connect { source, .. }
            | Self::StopAt { source, .. }
            | Self::CancelStop { source, .. }
            | Self::StopSource { source } => Some(source),
            _ => None,
        }
    }

    /// The stage slot this command touches, if any.
    pub fn stage(&self) -> Option<StageId> {
        match *self {
            Self::CreateStage { stage, .. }
            | Self::Connect { stage, .. }
            | Self::ConnectOutput { stage }
            | Self::Ramp { stage, .. }
            | Self::StopAt { stage, .. }
            | Self::CancelStop { stage, .. }
            | Self::RemoveStage { stage } => Some(stage),
            _ => None,
        }
    }
}

pub trait CommandReceiver {
    fn pop(&mut self) -> Option<EngineCommand>;
}

impl CommandReceiver for Consumer<EngineCommand> {
    fn pop(&mut self) -> Option<EngineCommand> {
        Consumer::pop(self).ok()
    }
}

impl CommandReceiver for std::collections::VecDeque<EngineCommand> {
    fn pop(&mut self) -> Option<EngineCommand> {
        self.pop_front()
    }
}
