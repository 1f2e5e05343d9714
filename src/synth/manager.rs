/*
Voice Reconciliation
====================

The input layer never says "note on" or "note off". It hands over the complete
set of pitches that should be sounding, every time anything changes, and the
voice manager works out the difference against the voices it already owns.

Vocabulary
----------

  desired     The set of pitches the player is holding right now.

  sounding    A voice that is attacking or holding at peak gain.

  releasing   A voice whose pitch left the desired set. Its gain is ramping
              down to the floor and it will be stopped at `until`.

  reap        Free every releasing voice whose deadline has passed.


The Diff
--------

    desired ∖ live        →  create voice, ramp floor → peak (attack)
    live ∖ desired        →  ramp current → floor (release), stop at deadline
    desired ∩ sounding    →  untouched
    desired ∩ releasing   →  revive: ramp current → peak, drop the deadline

Keeping sustained notes untouched is what makes repeated calls with the same
set silent. Reviving from the current level rather than from the floor is what
keeps a quick re-press from clicking.


Who Stops What
--------------

A release hands the backend a timed stop for the voice's source and stage at
`until`, so the tone goes silent when the ramp bottoms out even if nobody
calls back in. The voice itself stays in the map, carrying that deadline,
until `reap` frees its ids. A revive cancels the timed stop and overwrites the
deadline, so a stop that was superseded has nothing left to fire.

    t=0.00  reconcile({A})      create A, attack
    t=1.00  reconcile({})       A releasing until 1.15, stop scheduled
    t=1.05  reconcile({A})      A sounding again, stop cancelled,
                                attack from current level
    t=1.20  reap()              nothing to do, A keeps playing
*/

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::keyboard::{FrequencyTable, Pitch};

use super::backend::{Ramp, VoiceBackend};
use super::config::EnvelopeConfig;
use super::voice::Voice;

/// Owns every live voice and keeps them in step with the desired pitch set.
pub struct VoiceManager<B: VoiceBackend> {
    backend: B,
    voices: BTreeMap<Pitch, Voice>,
    table: FrequencyTable,
    envelope: EnvelopeConfig,
}

impl<B: VoiceBackend> VoiceManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            voices: BTreeMap::new(),
            table: FrequencyTable::default(),
            envelope: EnvelopeConfig::default(),
        }
    }

    /// Set the attack/release shape used for voices started from now on
    pub fn with_envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Restrict which pitches can sound
    pub fn with_frequency_table(mut self, table: FrequencyTable) -> Self {
        self.table = table;
        self
    }

    /// Bring the live voices in line with `desired`.
    ///
    /// `desired` is the complete set, not a delta. Calling this again with an
    /// unchanged set schedules nothing.
    pub fn reconcile(&mut self, desired: &BTreeSet<Pitch>) {
        let now = self.backend.now();
        self.reap_at(now);

        let Self {
            backend,
            voices,
            envelope,
            ..
        } = self;

        for (pitch, voice) in voices.iter_mut() {
            if desired.contains(pitch) {
                if voice.revive() {
                    debug!(%pitch, "reviving releasing voice");
                    backend.cancel_stop(voice.source(), voice.stage());
                    backend.schedule_ramp(
                        voice.stage(),
                        Ramp::exponential(envelope.peak, now, envelope.attack),
                    );
                }
            } else if voice.release(now + envelope.release) {
                let until = now + envelope.release;
                debug!(%pitch, until, "releasing voice");
                backend.schedule_ramp(
                    voice.stage(),
                    Ramp::exponential(envelope.floor, now, envelope.release),
                );
                backend.schedule_stop(voice.source(), voice.stage(), until);
            }
        }

        for &pitch in desired {
            if !self.voices.contains_key(&pitch) {
                self.start_voice(pitch, now);
            }
        }
    }

    /// Release every sounding voice.
    pub fn release_all(&mut self) {
        self.reconcile(&BTreeSet::new());
    }

    /// Stop and free voices whose release has completed. Returns how many
    /// were removed.
    pub fn reap(&mut self) -> usize {
        let now = self.backend.now();
        self.reap_at(now)
    }

    /// Stop and free every voice immediately, without a release ramp.
    pub fn stop_all(&mut self) {
        for (pitch, voice) in std::mem::take(&mut self.voices) {
            debug!(%pitch, "stopping voice");
            self.backend.stop_source(voice.source());
            self.backend.remove_stage(voice.stage());
        }
    }

    fn reap_at(&mut self, now: f64) -> usize {
        let before = self.voices.len();
        let backend = &mut self.backend;

        self.voices.retain(|pitch, voice| {
            if voice.is_finished(now) {
                debug!(%pitch, "release complete, freeing voice");
                backend.stop_source(voice.source());
                backend.remove_stage(voice.stage());
                false
            } else {
                true
            }
        });

        before - self.voices.len()
    }

    fn start_voice(&mut self, pitch: Pitch, now: f64) {
        let Some(frequency) = self.table.frequency(pitch) else {
            trace!(%pitch, "no frequency for pitch, not sounding it");
            return;
        };

        let Some(source) = self.backend.create_source(frequency) else {
            warn!(%pitch, "no free tone source, not sounding it");
            return;
        };

        let Some(stage) = self.backend.create_stage(self.envelope.floor) else {
            warn!(%pitch, "no free amplitude stage, not sounding it");
            self.backend.stop_source(source);
            return;
        };

        self.backend.connect(source, stage);
        self.backend.connect_output(stage);
        self.backend.schedule_ramp(
            stage,
            Ramp::exponential(self.envelope.peak, now, self.envelope.attack),
        );

        debug!(%pitch, frequency, "starting voice");
        self.voices
            .insert(pitch, Voice::new(pitch, frequency, source, stage, now));
    }

    pub fn voice(&self, pitch: Pitch) -> Option<&Voice> {
        self.voices.get(&pitch)
    }

    /// Live voices, lowest pitch first.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    pub fn is_sounding(&self, pitch: Pitch) -> bool {
        self.voices.get(&pitch).is_some_and(|v| !v.is_releasing())
    }

    pub fn is_releasing(&self, pitch: Pitch) -> bool {
        self.voices.get(&pitch).is_some_and(Voice::is_releasing)
    }

    /// Pitches with a live voice, releasing ones included, lowest first.
    pub fn live_pitches(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.voices.keys().copied()
    }

    /// Number of live voices, releasing ones included.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn sounding_count(&self) -> usize {
        self.voices.values().filter(|v| !v.is_releasing()).count()
    }

    pub fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
