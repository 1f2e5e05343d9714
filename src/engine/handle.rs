use std::collections::VecDeque;

use rtrb::{Producer, PushError};
use tracing::warn;

use crate::synth::backend::{Ramp, SourceId, StageId, VoiceBackend};

use super::clock::AudioClock;
use super::command::EngineCommand;

/// Fixed pool of slot indices. Lowest free index is handed out first.
#[derive(Debug)]
struct SlotPool {
    /// Sorted descending, so `pop` yields the lowest index.
    free: Vec<u32>,
}

impl SlotPool {
    fn new(capacity: usize) -> Self {
        Self {
            free: (0..capacity as u32).rev().collect(),
        }
    }

    fn acquire(&mut self) -> Option<u32> {
        self.free.pop()
    }

    fn release(&mut self, slot: u32) {
        let at = self.free.partition_point(|&s| s > slot);
        if self.free.get(at) != Some(&slot) {
            self.free.insert(at, slot);
        }
    }

    fn in_use(&self, capacity: usize) -> usize {
        capacity - self.free.len()
    }
}

/// Control-side half of the engine. Implements [`VoiceBackend`] by turning
/// every call into an [`EngineCommand`] for the audio thread.
///
/// Commands are delivered in call order. If the ring buffer is full they wait
/// in a local backlog that is drained on the next call or on [`flush`].
/// While waiting they are coalesced: a newer ramp replaces an older one for
/// the same stage, a newer stop or cancel replaces an older one for the same
/// source, and freeing a slot whose creation never left the backlog drops
/// that slot's whole history. The backlog therefore stays within a few
/// commands per slot however long the audio thread stalls.
///
/// [`flush`]: EngineHandle::flush
pub struct EngineHandle {
    tx: Producer<EngineCommand>,
    backlog: VecDeque<EngineCommand>,
    clock: AudioClock,
    capacity: usize,
    sources: SlotPool,
    stages: SlotPool,
}

impl EngineHandle {
    pub(crate) fn new(tx: Producer<EngineCommand>, clock: AudioClock, capacity: usize) -> Self {
        Self {
            tx,
            backlog: VecDeque::new(),
            clock,
            capacity,
            sources: SlotPool::new(capacity),
            stages: SlotPool::new(capacity),
        }
    }

    /// Push as much of the backlog as the ring buffer accepts. Returns the
    /// number of commands still waiting.
    pub fn flush(&mut self) -> usize {
        while let Some(command) = self.backlog.pop_front() {
            if let Err(PushError::Full(command)) = self.tx.push(command) {
                self.backlog.push_front(command);
                break;
            }
        }
        self.backlog.len()
    }

    fn send(&mut self, command: EngineCommand) {
        if self.flush() > 0 {
            self.defer(command);
            return;
        }
        if let Err(PushError::Full(command)) = self.tx.push(command) {
            warn!("engine command queue full, deferring");
            self.defer(command);
        }
    }

    fn defer(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Ramp { stage, .. } => self
                .backlog
                .retain(|c| !matches!(c, EngineCommand::Ramp { stage: s, .. } if *s == stage)),
            EngineCommand::StopAt { source, .. } | EngineCommand::CancelStop { source, .. } => {
                self.backlog.retain(|c| {
                    !matches!(
                        c,
                        EngineCommand::StopAt { source: s, .. }
                            | EngineCommand::CancelStop { source: s, .. } if *s == source
                    )
                })
            }
            EngineCommand::StopSource { source } => {
                let created = |c: &EngineCommand| {
                    matches!(c, EngineCommand::CreateSource { source: s, .. } if *s == source)
                };
                if self.drop_unsent(created, |c| c.source() == Some(source)) {
                    return;
                }
            }
            EngineCommand::RemoveStage { stage } => {
                let created = |c: &EngineCommand| {
                    matches!(c, EngineCommand::CreateStage { stage: s, .. } if *s == stage)
                };
                if self.drop_unsent(created, |c| c.stage() == Some(stage)) {
                    return;
                }
            }
            _ => {}
        }
        self.backlog.push_back(command);
    }

    /// If the latest creation of a slot is still queued, drop it and every
    /// later command for that slot. Earlier commands belong to a previous
    /// occupant the audio thread already knows about and are kept.
    fn drop_unsent(
        &mut self,
        created: impl Fn(&EngineCommand) -> bool,
        touches: impl Fn(&EngineCommand) -> bool,
    ) -> bool {
        let Some(from) = self.backlog.iter().rposition(created) else {
            return false;
        };
        let mut index = 0;
        self.backlog.retain(|c| {
            let keep = index < from || !touches(c);
            index += 1;
            keep
        });
        true
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Number of commands not yet handed to the audio thread.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    pub fn sources_in_use(&self) -> usize {
        self.sources.in_use(self.capacity)
    }

    pub fn stages_in_use(&self) -> usize {
        self.stages.in_use(self.capacity)
    }
}

impl VoiceBackend for EngineHandle {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn create_source(&mut self, frequency: f32) -> Option<SourceId> {
        let source = SourceId(self.sources.acquire()?);
        self.send(EngineCommand::CreateSource { source, frequency });
        Some(source)
    }

    fn create_stage(&mut self, gain: f32) -> Option<StageId> {
        let stage = StageId(self.stages.acquire()?);
        self.send(EngineCommand::CreateStage { stage, gain });
        Some(stage)
    }

    fn connect(&mut self, source: SourceId, stage: StageId) {
        self.send(EngineCommand::Connect { source, stage });
    }

    fn connect_output(&mut self, stage: StageId) {
        self.send(EngineCommand::ConnectOutput { stage });
    }

    fn schedule_ramp(&mut self, stage: StageId, ramp: Ramp) {
        self.send(EngineCommand::Ramp { stage, ramp });
    }

    fn schedule_stop(&mut self, source: SourceId, stage: StageId, at: f64) {
        self.send(EngineCommand::StopAt { source, stage, at });
    }

    fn cancel_stop(&mut self, source: SourceId, stage: StageId) {
        self.send(EngineCommand::CancelStop { source, stage });
    }

    fn stop_source(&mut self, source: SourceId) {
        self.send(EngineCommand::StopSource { source });
        self.sources.release(source.0);
    }

    fn remove_stage(&mut self, stage: StageId) {
        self.send(EngineCommand::RemoveStage { stage });
        self.stages.release(stage.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    fn handle(queue: usize, capacity: usize) -> (EngineHandle, rtrb::Consumer<EngineCommand>) {
        let (tx, rx) = RingBuffer::new(queue);
        (EngineHandle::new(tx, AudioClock::new(48_000.0), capacity), rx)
    }

    #[test]
    fn slots_are_recycled_lowest_first() {
        let (mut h, _rx) = handle(64, 2);
        assert_eq!(h.create_source(440.0), Some(SourceId(0)));
        assert_eq!(h.create_source(220.0), Some(SourceId(1)));
        assert_eq!(h.create_source(110.0), None);

        h.stop_source(SourceId(0));
        assert_eq!(h.sources_in_use(), 1);
        assert_eq!(h.create_source(330.0), Some(SourceId(0)));
    }

    #[test]
    fn lowest_slot_wins_regardless_of_free_order() {
        let (mut h, _rx) = handle(64, 3);
        for _ in 0..3 {
            h.create_source(440.0);
        }
        h.stop_source(SourceId(0));
        h.stop_source(SourceId(2));
        assert_eq!(h.create_source(220.0), Some(SourceId(0)));
        assert_eq!(h.create_source(220.0), Some(SourceId(2)));

        h.stop_source(SourceId(2));
        h.stop_source(SourceId(1));
        h.stop_source(SourceId(1));
        assert_eq!(h.sources_in_use(), 1);
        assert_eq!(h.create_source(220.0), Some(SourceId(1)));
    }

    #[test]
    fn backlog_coalesces_ramps_and_stops() {
        let (mut h, _rx) = handle(1, 4);
        let source = h.create_source(440.0).unwrap();
        let stage = h.create_stage(1e-4).unwrap();
        h.connect(source, stage);
        h.connect_output(stage);
        let base = h.pending();

        for i in 0..100 {
            let t = i as f64;
            h.schedule_ramp(stage, Ramp::exponential(1e-4, t, 0.15));
            h.schedule_stop(source, stage, t + 0.15);
            h.cancel_stop(source, stage);
            h.schedule_ramp(stage, Ramp::exponential(1.0, t, 0.2));
        }

        assert_eq!(h.pending(), base + 2);
        assert_eq!(
            h.backlog.back(),
            Some(&EngineCommand::Ramp {
                stage,
                ramp: Ramp::exponential(1.0, 99.0, 0.2)
            })
        );
    }

    #[test]
    fn freeing_an_unsent_slot_drops_its_history() {
        let (mut h, mut rx) = handle(1, 4);
        // Delivered: occupies the only ring slot
        let old = h.create_source(110.0).unwrap();
        h.stop_source(old);
        let reused = h.create_source(220.0).unwrap();
        assert_eq!(reused, old);
        let stage = h.create_stage(0.5).unwrap();
        h.connect(reused, stage);
        h.stop_source(reused);

        // The stop for the delivered occupant survives; the unsent one is gone
        let mut received = Vec::new();
        while h.pending() > 0 || !rx.is_empty() {
            if let Ok(command) = rx.pop() {
                received.push(command);
            }
            h.flush();
        }
        assert_eq!(
            received,
            vec![
                EngineCommand::CreateSource { source: old, frequency: 110.0 },
                EngineCommand::StopSource { source: old },
                EngineCommand::CreateStage { stage, gain: 0.5 },
            ]
        );
        assert_eq!(h.sources_in_use(), 0);
    }

    #[test]
    fn full_queue_defers_in_order() {
        let (mut h, mut rx) = handle(1, 4);
        let stage = h.create_stage(0.5).unwrap();
        h.connect_output(stage);
        h.schedule_ramp(stage, Ramp::linear(1.0, 0.0, 0.1));
        assert_eq!(h.pending(), 2);

        let mut received = Vec::new();
        while h.pending() > 0 || !rx.is_empty() {
            if let Ok(command) = rx.pop() {
                received.push(command);
            }
            h.flush();
        }

        assert_eq!(
            received,
            vec![
                EngineCommand::CreateStage { stage, gain: 0.5 },
                EngineCommand::ConnectOutput { stage },
                EngineCommand::Ramp {
                    stage,
                    ramp: Ramp::linear(1.0, 0.0, 0.1)
                },
            ]
        );
    }
}
