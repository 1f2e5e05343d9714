//! Low-level DSP primitives used by the rendering engine.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! run inside the audio callback. They stay focused on the signal-processing
//! math; which voices exist and when they change is decided elsewhere.

/// Output-stage dynamics compressor.
pub mod compressor;
/// Gain automation along scheduled ramps.
pub mod envelope;
/// Tone source waveforms.
pub mod oscillator;

pub use compressor::{Compressor, CompressorParams};
pub use envelope::GainParam;
pub use oscillator::{Oscillator, OscillatorWaveform};
