// Purpose: Voice management and polyphony
// This layer sits between the key layout and whatever renders audio

pub mod backend;
pub mod config;
pub mod manager;
pub mod voice;

pub use backend::{Curve, Ramp, SourceId, StageId, VoiceBackend};
pub use config::EnvelopeConfig;
pub use manager::VoiceManager;
pub use voice::{Voice, VoiceState};
