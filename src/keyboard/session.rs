//! Glue between raw key events and the voice manager.

use tracing::debug;

use crate::synth::{VoiceBackend, VoiceManager};

use super::layout::{ActiveSet, Interval, KeyLayout, LayoutError};

/// One player's keyboard: which keys are down, and the voices they drive.
///
/// Every call that changes the held keys recomputes the desired pitches from
/// scratch and hands them to the voice manager. Calls that change nothing do
/// not reach the voice manager at all.
pub struct KeyboardSession<B: VoiceBackend> {
    layout: KeyLayout,
    active: ActiveSet,
    voices: VoiceManager<B>,
}

impl<B: VoiceBackend> KeyboardSession<B> {
    pub fn new(layout: KeyLayout, voices: VoiceManager<B>) -> Self {
        Self {
            layout,
            active: ActiveSet::new(),
            voices,
        }
    }

    /// Key down. Returns `Ok(true)` if the key was not already held.
    pub fn press(&mut self, interval: Interval) -> Result<bool, LayoutError> {
        let changed = self.active.press(interval, &self.layout)?;
        if changed {
            self.sync();
        }
        Ok(changed)
    }

    /// Key up. Returns true if the key was held.
    pub fn release(&mut self, interval: Interval) -> bool {
        let changed = self.active.release(interval);
        if changed {
            self.sync();
        }
        changed
    }

    /// Lift every key, e.g. when input focus is lost.
    pub fn release_all(&mut self) -> bool {
        let changed = self.active.clear();
        if changed {
            self.sync();
        }
        changed
    }

    /// Move the whole layout to another octave. Held keys are released first
    /// so no voice is left sounding at the old pitch.
    pub fn set_base_octave(&mut self, base_octave: i8) {
        if self.layout.base_octave == base_octave {
            return;
        }
        self.release_all();
        debug!(base_octave, "shifting keyboard octave");
        self.layout.base_octave = base_octave;
    }

    /// Free voices whose release has finished. Call regularly.
    pub fn tick(&mut self) -> usize {
        self.voices.reap()
    }

    fn sync(&mut self) {
        let desired = self.layout.desired_notes(&self.active);
        self.voices.reconcile(&desired);
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn voices(&self) -> &VoiceManager<B> {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceManager<B> {
        &mut self.voices
    }
}
