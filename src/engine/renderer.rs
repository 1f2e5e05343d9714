use crate::dsp::{Compressor, GainParam, Oscillator, OscillatorWaveform};
use crate::synth::backend::{SourceId, StageId};
use crate::MAX_BLOCK_SIZE;

use super::clock::AudioClock;
use super::command::{CommandReceiver, EngineCommand};
use super::EngineConfig;

struct Tone {
    osc: Oscillator,
    stage: Option<StageId>,
    /// Silent from this time on, until cancelled or the slot is reused
    stop_at: Option<f64>,
}

impl Tone {
    fn is_running(&self, now: f64) -> bool {
        self.stop_at.map_or(true, |at| at > now)
    }
}

struct Stage {
    gain: GainParam,
    live: bool,
    routed: bool,
    stop_at: Option<f64>,
    /// Per-sample gain for the block being rendered
    buffer: Vec<f32>,
}

/// Audio-side half of the engine.
///
/// Owns every tone and amplitude stage. Each block it applies the queued
/// commands, then renders
///
/// ```text
/// out = compressor(master_gain × Σ tone × stage_gain)
/// ```
///
/// over all tones whose stage is routed to the output and whose scheduled
/// stop has not passed, and advances the shared clock. Slot storage is sized
/// up front; rendering never allocates.
pub struct Renderer<R: CommandReceiver> {
    rx: R,
    clock: AudioClock,
    sample_rate: f32,
    waveform: OscillatorWaveform,
    master_gain: f32,
    compressor: Option<Compressor>,
    tones: Vec<Option<Tone>>,
    stages: Vec<Stage>,
}

impl<R: CommandReceiver> Renderer<R> {
    pub fn new(rx: R, clock: AudioClock, config: &EngineConfig) -> Self {
        let stages = (0..config.max_voices)
            .map(|_| Stage {
                gain: GainParam::new(0.0),
                live: false,
                routed: false,
                stop_at: None,
                buffer: vec![0.0; MAX_BLOCK_SIZE],
            })
            .collect();

        Self {
            rx,
            sample_rate: clock.sample_rate(),
            clock,
            waveform: config.waveform,
            master_gain: config.master_gain,
            compressor: config
                .compressor
                .map(|params| Compressor::new(params, config.sample_rate)),
            tones: (0..config.max_voices).map(|_| None).collect(),
            stages,
        }
    }

    /// Render mono audio into `out`, advancing the clock by `out.len()` frames.
    pub fn render(&mut self, out: &mut [f32]) {
        self.apply_commands();

        for block in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(block);
        }
    }

    fn apply_commands(&mut self) {
        let now = self.clock.now();
        while let Some(command) = self.rx.pop() {
            self.apply(command, now);
        }
    }

    fn apply(&mut self, command: EngineCommand, now: f64) {
        match command {
            EngineCommand::CreateSource { source, frequency } => {
                if let Some(slot) = self.tones.get_mut(source.0 as usize) {
                    *slot = Some(Tone {
                        osc: Oscillator::new(self.waveform, frequency),
                        stage: None,
                        stop_at: None,
                    });
                }
            }
            EngineCommand::CreateStage { stage, gain } => {
                if let Some(slot) = self.stages.get_mut(stage.0 as usize) {
                    slot.gain = GainParam::new(gain);
                    slot.live = true;
                    slot.routed = false;
                    slot.stop_at = None;
                }
            }
            EngineCommand::Connect { source, stage } => {
                if let Some(Some(tone)) = self.tones.get_mut(source.0 as usize) {
                    tone.stage = Some(stage);
                }
            }
            EngineCommand::ConnectOutput { stage } => {
                if let Some(slot) = self.stages.get_mut(stage.0 as usize) {
                    slot.routed = slot.live;
                }
            }
            EngineCommand::Ramp { stage, ramp } => {
                if let Some(slot) = self.stages.get_mut(stage.0 as usize) {
                    if slot.live {
                        slot.gain.schedule(ramp, now);
                    }
                }
            }
            EngineCommand::StopAt { source, stage, at } => self.set_stop(source, stage, Some(at)),
            EngineCommand::CancelStop { source, stage } => self.set_stop(source, stage, None),
            EngineCommand::StopSource { source } => {
                if let Some(slot) = self.tones.get_mut(source.0 as usize) {
                    *slot = None;
                }
            }
            EngineCommand::RemoveStage { stage } => {
                if let Some(slot) = self.stages.get_mut(stage.0 as usize) {
                    slot.live = false;
                    slot.routed = false;
                }
            }
        }
    }

    fn set_stop(&mut self, source: SourceId, stage: StageId, at: Option<f64>) {
        if let Some(Some(tone)) = self.tones.get_mut(source.0 as usize) {
            tone.stop_at = at;
        }
        if let Some(slot) = self.stages.get_mut(stage.0 as usize) {
            if slot.live {
                slot.stop_at = at;
            }
        }
    }

    fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len();
        let start_time = self.clock.now();
        out.fill(0.0);

        for stage in self.stages.iter_mut().filter(|s| s.routed) {
            stage
                .gain
                .render(&mut stage.buffer[..frames], start_time, self.sample_rate);
        }

        for tone in self.tones.iter_mut().flatten() {
            let Some(stage) = tone.stage.and_then(|id| self.stages.get(id.0 as usize)) else {
                continue;
            };
            if !stage.routed {
                continue;
            }
            let audible = match tone.stop_at {
                Some(at) => frames_until(at, start_time, self.sample_rate).min(frames),
                None => frames,
            };
            for (sample, &gain) in out[..audible].iter_mut().zip(&stage.buffer[..audible]) {
                *sample += tone.osc.next_sample(self.sample_rate) * gain;
            }
        }

        for sample in out.iter_mut() {
            *sample *= self.master_gain;
        }
        if let Some(compressor) = &mut self.compressor {
            compressor.process_block(out);
        }

        self.clock.advance(frames);
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Sources that are still producing sound. A source past its scheduled
    /// stop no longer counts.
    pub fn live_sources(&self) -> usize {
        let now = self.clock.now();
        self.tones.iter().flatten().filter(|t| t.is_running(now)).count()
    }

    /// Stages still routed to the output and not past a scheduled stop.
    pub fn live_stages(&self) -> usize {
        let now = self.clock.now();
        self.stages
            .iter()
            .filter(|s| s.live && s.stop_at.map_or(true, |at| at > now))
            .count()
    }

    /// Current gain of a stage, if it is live.
    pub fn stage_gain(&self, stage: StageId) -> Option<f32> {
        self.stages
            .get(stage.0 as usize)
            .filter(|s| s.live)
            .map(|s| s.gain.value())
    }

    /// Frequency of a source, if it is running.
    pub fn source_frequency(&self, source: SourceId) -> Option<f32> {
        self.tones
            .get(source.0 as usize)
            .and_then(Option::as_ref)
            .map(|tone| tone.osc.frequency())
    }

    /// Compressor gain reduction in dB, zero when bypassed.
    pub fn reduction_db(&self) -> f32 {
        self.compressor
            .as_ref()
            .map_or(0.0, Compressor::reduction_db)
    }
}

/// Frames of a block starting at `start` that fall before `at`, to the
/// nearest frame.
fn frames_until(at: f64, start: f64, sample_rate: f32) -> usize {
    ((at - start) * sample_rate as f64).round().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::backend::Ramp;
    use std::collections::VecDeque;

    fn renderer(commands: Vec<EngineCommand>) -> Renderer<VecDeque<EngineCommand>> {
        let config = EngineConfig::default()
            .sample_rate(1_000.0)
            .max_voices(4)
            .master_gain(1.0)
            .compressor(None);
        Renderer::new(commands.into(), AudioClock::new(1_000.0), &config)
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn unrouted_tone_is_silent() {
        let mut r = renderer(vec![
            EngineCommand::CreateSource {
                source: SourceId(0),
                frequency: 100.0,
            },
            EngineCommand::CreateStage {
                stage: StageId(0),
                gain: 1.0,
            },
            EngineCommand::Connect {
                source: SourceId(0),
                stage: StageId(0),
            },
        ]);
        let mut out = vec![0.0; 100];
        r.render(&mut out);
        assert_eq!(peak(&out), 0.0);
        assert_eq!(r.clock().frames(), 100);
    }

    #[test]
    fn routed_tone_follows_its_stage() {
        let mut r = renderer(vec![
            EngineCommand::CreateSource {
                source: SourceId(1),
                frequency: 250.0,
            },
            EngineCommand::CreateStage {
                stage: StageId(2),
                gain: 0.5,
            },
            EngineCommand::Connect {
                source: SourceId(1),
                stage: StageId(2),
            },
            EngineCommand::ConnectOutput { stage: StageId(2) },
        ]);
        let mut out = vec![0.0; 100];
        r.render(&mut out);
        assert!((peak(&out) - 0.5).abs() < 0.01);
        assert_eq!(r.source_frequency(SourceId(1)), Some(250.0));
        assert_eq!(r.stage_gain(StageId(2)), Some(0.5));
    }

    #[test]
    fn ramp_and_removal() {
        let mut r = renderer(vec![
            EngineCommand::CreateSource {
                source: SourceId(0),
                frequency: 100.0,
            },
            EngineCommand::CreateStage {
                stage: StageId(0),
                gain: 1e-4,
            },
            EngineCommand::Connect {
                source: SourceId(0),
                stage: StageId(0),
            },
            EngineCommand::ConnectOutput { stage: StageId(0) },
            EngineCommand::Ramp {
                stage: StageId(0),
                ramp: Ramp::exponential(1.0, 0.0, 0.2),
            },
        ]);
        let mut out = vec![0.0; 300];
        r.render(&mut out);
        assert_eq!(r.stage_gain(StageId(0)), Some(1.0));
        assert!(peak(&out[..50]) < 0.01);
        assert!(peak(&out[250..]) > 0.9);

        r.rx.push_back(EngineCommand::StopSource { source: SourceId(0) });
        r.rx.push_back(EngineCommand::RemoveStage { stage: StageId(0) });
        r.render(&mut out);
        assert_eq!(peak(&out), 0.0);
        assert_eq!(r.live_sources(), 0);
        assert_eq!(r.live_stages(), 0);
        assert_eq!(r.stage_gain(StageId(0)), None);
    }

    fn routed(frequency: f32, gain: f32) -> Vec<EngineCommand> {
        vec![
            EngineCommand::CreateSource {
                source: SourceId(0),
                frequency,
            },
            EngineCommand::CreateStage {
                stage: StageId(0),
                gain,
            },
            EngineCommand::Connect {
                source: SourceId(0),
                stage: StageId(0),
            },
            EngineCommand::ConnectOutput { stage: StageId(0) },
        ]
    }

    #[test]
    fn timed_stop_silences_without_further_commands() {
        let mut commands = routed(250.0, 1.0);
        commands.push(EngineCommand::StopAt {
            source: SourceId(0),
            stage: StageId(0),
            at: 0.1,
        });
        let mut r = renderer(commands);

        let mut out = vec![0.0; 200];
        r.render(&mut out);
        assert!(peak(&out[..100]) > 0.9);
        assert_eq!(peak(&out[100..]), 0.0);
        assert_eq!(r.live_sources(), 0);
        assert_eq!(r.live_stages(), 0);
    }

    #[test]
    fn stop_cancelled_in_time_never_fires() {
        let mut commands = routed(250.0, 1.0);
        commands.push(EngineCommand::StopAt {
            source: SourceId(0),
            stage: StageId(0),
            at: 0.1,
        });
        commands.push(EngineCommand::CancelStop {
            source: SourceId(0),
            stage: StageId(0),
        });
        let mut r = renderer(commands);

        let mut out = vec![0.0; 200];
        r.render(&mut out);
        assert!(peak(&out[100..]) > 0.9);
        assert_eq!(r.live_sources(), 1);
    }

    #[test]
    fn late_cancel_resumes_a_stopped_tone() {
        let mut commands = routed(250.0, 1.0);
        commands.push(EngineCommand::StopAt {
            source: SourceId(0),
            stage: StageId(0),
            at: 0.05,
        });
        let mut r = renderer(commands);

        let mut out = vec![0.0; 100];
        r.render(&mut out);
        assert_eq!(r.live_sources(), 0);

        r.rx.push_back(EngineCommand::CancelStop {
            source: SourceId(0),
            stage: StageId(0),
        });
        r.render(&mut out);
        assert!(peak(&out) > 0.9);
        assert_eq!(r.live_sources(), 1);
        assert_eq!(r.live_stages(), 1);
    }

    #[test]
    fn out_of_range_ids_are_ignored() {
        let mut r = renderer(vec![EngineCommand::CreateSource {
            source: SourceId(99),
            frequency: 100.0,
        }]);
        let mut out = vec![0.0; 10];
        r.render(&mut out);
        assert_eq!(r.live_sources(), 0);
    }
}
