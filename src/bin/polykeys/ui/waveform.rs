//! Output scope widget
//!
//! Shows half of the visualization buffer, starting at the first rising zero
//! crossing so a held chord stands still instead of scrolling.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Master gain keeps the sum well under full scale, so the scope zooms in.
const SCOPE_RANGE: f64 = 0.5;

/// The part of `samples` to draw: `samples.len() / 2` samples from the first
/// rising zero crossing in the older half, or the newest half when there is
/// none (silence, or a tone too low to cross in time).
fn triggered_window(samples: &[f32]) -> (&[f32], bool) {
    if samples.len() < 2 {
        return (samples, false);
    }
    let span = samples.len() / 2;
    let trigger = samples[..=span]
        .windows(2)
        .position(|pair| pair[0] < 0.0 && pair[1] >= 0.0)
        .map(|i| i + 1);

    match trigger {
        Some(start) => (&samples[start..start + span], true),
        None => (&samples[samples.len() - span..], false),
    }
}

/// Render the most recent output samples
pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32]) {
    let (window, locked) = triggered_window(audio_buffer);
    let title = if locked { " Output (trig) " } else { " Output " };
    let block = Block::default().title(title).borders(Borders::ALL);

    let len = window.len().max(1) as f64;
    let data: Vec<(f64, f64)> = window
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64 / len, (sample as f64).clamp(-SCOPE_RANGE, SCOPE_RANGE)))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(if locked { Color::Cyan } else { Color::DarkGray }))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(Axis::default().bounds([0.0, 1.0]))
        .y_axis(
            Axis::default()
                .bounds([-SCOPE_RANGE, SCOPE_RANGE])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
