//! polykeys - play the computer keyboard like a piano
//!
//! Run with: cargo run --release
//!
//! Set POLYKEYS_LOG=<file> to write a debug log (filter with RUST_LOG).

mod app;
mod ui;

use app::Polykeys;
use polykeys::{keyboard::KeyLayout, synth::EnvelopeConfig};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    app::init_logging()?;

    Polykeys::new()
        .layout(KeyLayout::default())
        .envelope(EnvelopeConfig::default())
        .master_gain(0.2)
        .run()
}
