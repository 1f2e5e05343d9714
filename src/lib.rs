pub mod dsp;
#[cfg(feature = "rtrb")]
pub mod engine; // Realtime tone engine (control handle + audio renderer)
pub mod keyboard; // Key positions, pitches and frequencies
pub mod synth; // Voice management and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;
