//! Status bar widget - shows device, octave, voice counts and audio stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polykeys::{keyboard::KeyboardSession, synth::VoiceBackend};

use crate::app::DeviceInfo;

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    /// Compute audio stats from a buffer
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

/// Render the status bar
pub fn render_transport<B: VoiceBackend>(
    frame: &mut Frame,
    area: Rect,
    device: &DeviceInfo,
    session: &KeyboardSession<B>,
    audio_stats: &AudioStats,
) {
    let block = Block::default().title(" polykeys ").borders(Borders::ALL);

    let voices = session.voices();
    let sounding = voices.sounding_count();
    let releasing = voices.voice_count() - sounding;

    let line = Line::from(vec![
        Span::styled(
            format!(" Octave {}  ", session.layout().base_octave),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Held {}  ", session.active().len()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Sounding {}  ", sounding),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("Releasing {}  ", releasing),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!(
                "{} {:.1}kHz {}ch  ",
                device.name,
                device.sample_rate / 1000.0,
                device.channels
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", audio_stats.peak, audio_stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
