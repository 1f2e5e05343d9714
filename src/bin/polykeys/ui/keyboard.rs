//! Keyboard widget - one cell per key, lit while the key is held

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polykeys::{
    keyboard::{keymap::key_for_interval, HighlightSink, Interval, KeyboardSession},
    synth::VoiceBackend,
};

const CELL_WIDTH: usize = 5;

/// Enabled flag per key, filled from the session's active set.
struct KeyHighlights(Vec<bool>);

impl HighlightSink for KeyHighlights {
    fn set_highlight(&mut self, interval: Interval, enabled: bool) {
        if let Some(slot) = self.0.get_mut(interval) {
            *slot = enabled;
        }
    }
}

/// Render the key row
pub fn render_keyboard<B: VoiceBackend>(frame: &mut Frame, area: Rect, session: &KeyboardSession<B>) {
    let layout = session.layout();
    let mut highlights = KeyHighlights(vec![false; layout.size]);
    session.active().sync_highlights(layout, &mut highlights);

    let mut keys = Vec::with_capacity(layout.size);
    let mut names = Vec::with_capacity(layout.size);
    let mut voices = Vec::with_capacity(layout.size);

    for (interval, pitch) in layout.pitches().enumerate() {
        let held = highlights.0[interval];
        let base = if pitch.name.is_sharp() {
            Style::default().fg(Color::White).bg(Color::Black)
        } else {
            Style::default().fg(Color::Black).bg(Color::Gray)
        };
        let style = if held {
            base.bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            base
        };

        let key = key_for_interval(interval).map_or(' ', |c| c.to_ascii_uppercase());
        keys.push(Span::styled(format!("{:^CELL_WIDTH$}", key), style));
        names.push(Span::styled(format!("{:^CELL_WIDTH$}", pitch.to_string()), style));

        let marker = if session.voices().is_sounding(pitch) {
            Span::styled(format!("{:^CELL_WIDTH$}", "●"), Style::default().fg(Color::Green))
        } else if session.voices().is_releasing(pitch) {
            Span::styled(format!("{:^CELL_WIDTH$}", "○"), Style::default().fg(Color::Yellow))
        } else {
            Span::raw(" ".repeat(CELL_WIDTH))
        };
        voices.push(marker);
    }

    let block = Block::default()
        .title(format!(" Keyboard (octave {}) ", layout.base_octave))
        .borders(Borders::ALL);
    let paragraph = Paragraph::new(vec![
        Line::from(keys),
        Line::from(names),
        Line::default(),
        Line::from(voices),
    ])
    .block(block);
    frame.render_widget(paragraph, area);
}
