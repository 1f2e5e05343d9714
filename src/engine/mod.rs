//! Realtime tone engine.
//!
//! The engine is split in two halves joined by a lock-free ring buffer:
//!
//! - [`EngineHandle`] lives on the control thread and implements
//!   [`VoiceBackend`](crate::synth::VoiceBackend), so a voice manager can
//!   drive it directly.
//! - [`Renderer`] lives in the audio callback, applies the queued commands and
//!   produces samples.
//!
//! Both halves share one [`AudioClock`] that only the renderer advances.
//!
//! ```ignore
//! let (handle, mut renderer) = engine::channel(EngineConfig::default().sample_rate(48_000.0));
//! let mut voices = VoiceManager::new(handle);
//! // control thread: voices.reconcile(&desired)
//! // audio thread:   renderer.render(&mut block)
//! ```

pub mod clock;
pub mod command;
pub mod handle;
pub mod renderer;

use rtrb::{Consumer, RingBuffer};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::{CompressorParams, OscillatorWaveform};

pub use clock::AudioClock;
pub use command::{CommandReceiver, EngineCommand};
pub use handle::EngineHandle;
pub use renderer::Renderer;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Tone sources (and amplitude stages) the engine can hold at once.
    pub max_voices: usize,
    /// Shared output gain applied to the sum of all voices.
    pub master_gain: f32,
    pub waveform: OscillatorWaveform,
    /// `None` bypasses the output compressor.
    pub compressor: Option<CompressorParams>,
    /// Ring buffer slots between the control and audio threads.
    pub queue_capacity: usize,
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain.max(0.0);
        self
    }

    pub fn waveform(mut self, waveform: OscillatorWaveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn compressor(mut self, params: Option<CompressorParams>) -> Self {
        self.compressor = params;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: 64,
            master_gain: 0.2,
            waveform: OscillatorWaveform::Sine,
            compressor: Some(CompressorParams::default()),
            queue_capacity: 1024,
        }
    }
}

/// Build a connected handle/renderer pair.
pub fn channel(config: EngineConfig) -> (EngineHandle, Renderer<Consumer<EngineCommand>>) {
    let (tx, rx) = RingBuffer::new(config.queue_capacity);
    let clock = AudioClock::new(config.sample_rate);
    let handle = EngineHandle::new(tx, clock.clone(), config.max_voices);
    let renderer = Renderer::new(rx, clock, &config);
    (handle, renderer)
}
