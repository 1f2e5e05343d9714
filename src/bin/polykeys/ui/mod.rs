//! TUI module for polykeys
//!
//! Turns terminal key events into key presses on a [`KeyboardSession`] and
//! shows the held keys, voice counts and the output waveform.

mod keyboard;
mod transport;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use polykeys::{
    engine::EngineHandle,
    keyboard::{keymap::interval_for_key, Interval, KeyboardSession},
};

use crate::app::DeviceInfo;

use keyboard::render_keyboard;
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

/// Audio visualization buffer size
pub const VIS_BUFFER_SIZE: usize = 1024;

/// Without key release events a held key is only visible through autorepeat.
/// A key counts as released once no repeat has arrived for this long.
const HOLD_TIMEOUT: Duration = Duration::from_millis(600);

const MAX_OCTAVE: i8 = 7;

/// UI application state
pub struct UiApp {
    session: KeyboardSession<EngineHandle>,
    /// Ring buffer receiver for audio samples
    audio_rx: Consumer<f32>,
    /// Audio sample buffer for visualization
    audio_buffer: Vec<f32>,
    device: DeviceInfo,
    /// Terminal reports key release events
    key_release_events: bool,
    /// Last press or repeat per held key, used when release events are missing
    held_since: HashMap<Interval, Instant>,
    /// Whether the app should quit
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        session: KeyboardSession<EngineHandle>,
        audio_rx: Consumer<f32>,
        device: DeviceInfo,
        key_release_events: bool,
    ) -> Self {
        Self {
            session,
            audio_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            device,
            key_release_events,
            held_since: HashMap::new(),
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.expire_held_keys(Instant::now());
            self.session.tick();
            self.session.voices_mut().backend_mut().flush();

            terminal.draw(|frame| self.render(frame))?;

            // Drain every pending event, waiting at most one frame (~60fps)
            let mut timeout = Duration::from_millis(16);
            while event::poll(timeout)? {
                self.handle_event(event::read()?);
                timeout = Duration::ZERO;
            }
        }

        self.session.voices_mut().stop_all();
        self.session.voices_mut().backend_mut().flush();
        Ok(())
    }

    /// Poll for new audio samples from ring buffer
    fn poll_audio(&mut self) {
        let available = self.audio_rx.slots();
        if available == 0 {
            return;
        }
        if let Ok(chunk) = self.audio_rx.read_chunk(available) {
            self.audio_buffer.extend(chunk);
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::FocusLost => {
                debug!("focus lost, releasing all keys");
                self.held_since.clear();
                self.session.release_all();
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }

        let KeyCode::Char(c) = key.code else {
            return;
        };

        if let Some(interval) = interval_for_key(c) {
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => self.press(interval),
                KeyEventKind::Release => self.release(interval),
            }
            return;
        }

        if key.kind != KeyEventKind::Press {
            return;
        }
        match c.to_ascii_lowercase() {
            'z' => self.shift_octave(-1),
            'x' => self.shift_octave(1),
            _ => {}
        }
    }

    fn press(&mut self, interval: Interval) {
        if !self.key_release_events {
            self.held_since.insert(interval, Instant::now());
        }
        if let Err(err) = self.session.press(interval) {
            warn!("ignoring key: {}", err);
        }
    }

    fn release(&mut self, interval: Interval) {
        self.held_since.remove(&interval);
        self.session.release(interval);
    }

    fn expire_held_keys(&mut self, now: Instant) {
        if self.key_release_events {
            return;
        }
        let expired: Vec<Interval> = self
            .held_since
            .iter()
            .filter(|(_, at)| now.duration_since(**at) > HOLD_TIMEOUT)
            .map(|(interval, _)| *interval)
            .collect();
        for interval in expired {
            self.release(interval);
        }
    }

    fn shift_octave(&mut self, delta: i8) {
        let octave = (self.session.layout().base_octave + delta).clamp(0, MAX_OCTAVE);
        self.held_since.clear();
        self.session.set_base_octave(octave);
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Main layout: status, keyboard, waveform, help
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Length(7), // Keyboard
                Constraint::Min(6),    // Waveform
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_transport(frame, chunks[0], &self.device, &self.session, &stats);
        render_keyboard(frame, chunks[1], &self.session);
        render_waveform(frame, chunks[2], &self.audio_buffer);

        let help = if self.key_release_events {
            " [a-'] Play  [Z/X] Octave down/up  [Esc] Quit"
        } else {
            " [a-'] Play (hold to sustain)  [Z/X] Octave down/up  [Esc] Quit"
        };
        let help = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
