#![cfg(feature = "rtrb")]

use std::collections::BTreeSet;

use polykeys::{
    engine::{self, EngineConfig, EngineHandle, Renderer},
    keyboard::{NoteName, Pitch},
    synth::VoiceManager,
};

const SAMPLE_RATE: f32 = 8_000.0;

const A4: Pitch = Pitch::new(NoteName::A, 4);
const E5: Pitch = Pitch::new(NoteName::E, 5);

fn config() -> EngineConfig {
    EngineConfig::default()
        .sample_rate(SAMPLE_RATE)
        .max_voices(8)
        .compressor(None)
}

fn render_seconds<R: engine::CommandReceiver>(renderer: &mut Renderer<R>, seconds: f32) -> Vec<f32> {
    let mut out = vec![0.0; (seconds * SAMPLE_RATE).round() as usize];
    renderer.render(&mut out);
    out
}

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

fn set(pitches: &[Pitch]) -> BTreeSet<Pitch> {
    pitches.iter().copied().collect()
}

#[test]
fn silent_without_voices() {
    let (_handle, mut renderer) = engine::channel(config());
    let out = render_seconds(&mut renderer, 0.1);
    assert_eq!(peak(&out), 0.0);
    assert_eq!(renderer.clock().frames(), 800);
}

#[test]
fn voice_becomes_audible_then_is_freed() {
    let (handle, mut renderer) = engine::channel(config());
    let mut voices = VoiceManager::new(handle);

    voices.reconcile(&set(&[A4]));
    let out = render_seconds(&mut renderer, 0.3);

    // Attack starts near silence and reaches master gain × peak
    assert!(peak(&out[..100]) < 0.01);
    let tail = peak(&out[out.len() - 400..]);
    assert!(tail > 0.15 && tail <= 0.2 + 1e-4, "tail peak {tail}");
    assert_eq!(renderer.live_sources(), 1);

    voices.reconcile(&BTreeSet::new());
    render_seconds(&mut renderer, 0.2);
    assert_eq!(voices.reap(), 1);
    assert_eq!(voices.backend().sources_in_use(), 0);
    assert_eq!(voices.backend().stages_in_use(), 0);

    let out = render_seconds(&mut renderer, 0.05);
    assert_eq!(peak(&out), 0.0);
    assert_eq!(renderer.live_sources(), 0);
    assert_eq!(renderer.live_stages(), 0);
}

#[test]
fn released_voice_goes_silent_without_reaping() {
    let (handle, mut renderer) = engine::channel(config());
    let mut voices = VoiceManager::new(handle);

    voices.reconcile(&set(&[A4]));
    render_seconds(&mut renderer, 0.5);
    voices.reconcile(&BTreeSet::new());

    let out = render_seconds(&mut renderer, 10.0);
    assert_eq!(renderer.live_sources(), 0);
    assert_eq!(renderer.live_stages(), 0);
    assert_eq!(peak(&out[out.len() / 2..]), 0.0);

    // Bookkeeping catches up on the next reap
    assert_eq!(voices.voice_count(), 1);
    assert_eq!(voices.reap(), 1);
    assert_eq!(voices.backend().sources_in_use(), 0);
}

#[test]
fn stalled_audio_thread_keeps_the_backlog_bounded() {
    let (handle, _renderer) = engine::channel(config().queue_capacity(1));
    let mut voices = VoiceManager::new(handle);
    let chord = set(&[A4, E5]);

    for _ in 0..500 {
        voices.reconcile(&chord);
        voices.reconcile(&BTreeSet::new());
    }

    // Two voices, each at most: create source/stage, connect, route, ramp, stop
    assert!(voices.backend().pending() <= 12, "{}", voices.backend().pending());
    assert_eq!(voices.voice_count(), 2);
}

#[test]
fn revived_voice_keeps_playing() {
    let (handle, mut renderer) = engine::channel(config());
    let mut voices = VoiceManager::new(handle);

    voices.reconcile(&set(&[A4, E5]));
    render_seconds(&mut renderer, 0.3);
    voices.reconcile(&set(&[E5]));
    render_seconds(&mut renderer, 0.05);
    voices.reconcile(&set(&[A4, E5]));

    render_seconds(&mut renderer, 0.3);
    assert_eq!(voices.reap(), 0);
    assert_eq!(voices.voice_count(), 2);
    assert_eq!(renderer.live_sources(), 2);
    assert_eq!(renderer.live_stages(), 2);
}

#[test]
fn master_gain_scales_output() {
    let render_with = |gain: f32| {
        let (handle, mut renderer) = engine::channel(config().master_gain(gain));
        let mut voices: VoiceManager<EngineHandle> = VoiceManager::new(handle);
        voices.reconcile(&set(&[A4]));
        render_seconds(&mut renderer, 0.3)
    };

    let quiet = render_with(0.2);
    let loud = render_with(0.4);
    for (q, l) in quiet.iter().zip(&loud) {
        assert!((l - 2.0 * q).abs() < 1e-5);
    }
}

#[test]
fn exhausted_engine_skips_extra_voices() {
    let (handle, mut renderer) = engine::channel(config().max_voices(2));
    let mut voices = VoiceManager::new(handle);

    let chord = set(&[
        Pitch::new(NoteName::C, 4),
        Pitch::new(NoteName::E, 4),
        Pitch::new(NoteName::G, 4),
    ]);
    voices.reconcile(&chord);
    assert_eq!(voices.voice_count(), 2);

    render_seconds(&mut renderer, 0.01);
    assert_eq!(renderer.live_sources(), 2);
}
