//! Polykeys - application builder and runner

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use rtrb::RingBuffer;
use std::{fs::File, io::stdout, sync::Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polykeys::{
    engine::{self, EngineConfig},
    keyboard::{KeyLayout, KeyboardSession},
    synth::{EnvelopeConfig, VoiceManager},
    MAX_BLOCK_SIZE,
};

use super::ui::{UiApp, VIS_BUFFER_SIZE};

/// Output device facts shown in the status bar
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub sample_rate: f32,
    pub channels: usize,
}

/// Main application builder
pub struct Polykeys {
    layout: KeyLayout,
    envelope: EnvelopeConfig,
    engine: EngineConfig,
}

impl Polykeys {
    pub fn new() -> Self {
        Self {
            layout: KeyLayout::default(),
            envelope: EnvelopeConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the key layout (base octave and number of keys)
    pub fn layout(mut self, layout: KeyLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the attack/release shape
    pub fn envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Set the gain applied to the sum of all voices
    pub fn master_gain(mut self, gain: f32) -> Self {
        self.engine = self.engine.master_gain(gain);
        self
    }

    /// Run the application (takes over the terminal, plays audio)
    pub fn run(self) -> EyreResult<()> {
        // Set up audio
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let info = DeviceInfo {
            name: device.name().unwrap_or_else(|_| "unknown device".into()),
            sample_rate: config.sample_rate().0 as f32,
            channels: config.channels() as usize,
        };
        info!(device = %info.name, sample_rate = info.sample_rate, channels = info.channels, "opening output");

        let (handle, mut renderer) = engine::channel(self.engine.sample_rate(info.sample_rate));
        let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * 4);

        let channels = info.channels;
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut render_buf[..frames_to_render];
                    renderer.render(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                        // Scope drops samples when the UI falls behind
                        let _ = scope_tx.push(s);
                    }

                    frames_written += frames_to_render;
                }
            },
            |err| error!("audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        let voices = VoiceManager::new(handle).with_envelope(self.envelope);
        let session = KeyboardSession::new(self.layout, voices);

        // Key release events need the kitty keyboard protocol
        let key_release_events = supports_keyboard_enhancement().unwrap_or(false);
        info!(key_release_events, "terminal keyboard support");

        let mut terminal = ratatui::init();
        if key_release_events {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        execute!(stdout(), EnableFocusChange)?;

        let mut app = UiApp::new(session, scope_rx, info, key_release_events);
        let result = app.run(&mut terminal);

        if key_release_events {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        execute!(stdout(), DisableFocusChange)?;
        ratatui::restore();

        drop(stream);
        result
    }
}

impl Default for Polykeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Log to the file named by `POLYKEYS_LOG`, if set. The terminal belongs to
/// the UI, so nothing is logged there.
pub fn init_logging() -> EyreResult<()> {
    let Some(path) = std::env::var_os("POLYKEYS_LOG") else {
        return Ok(());
    };
    let file = File::create(&path)
        .wrap_err_with(|| format!("failed to create log file {}", path.to_string_lossy()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polykeys=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
