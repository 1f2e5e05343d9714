// Purpose: Key positions, pitches and frequencies
// Everything here is pure data except `session`, which drives a voice manager

pub mod frequency;
pub mod keymap;
pub mod layout;
pub mod pitch;
pub mod session;

pub use frequency::{FrequencyTable, STANDARD};
pub use layout::{
    pitch_for_interval, try_pitch_for_interval, ActiveSet, HighlightSink, Interval, KeyLayout,
    LayoutError,
};
pub use pitch::{ChromaticScale, NoteName, Pitch, CHROMATIC};
pub use session::KeyboardSession;
