//! End-to-end scenarios driving the whole manager on simulated backends

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rf_audio_manager::{
    AudioManager, AudioManagerConfig, AudioManagerHandle, ClipId, DispatchError, Easing,
    FadeCurve, FadeError, FadeRequest, ManualClock, MixerConfig, ParameterId, Placement,
    PoolPolicy, SimAudioBackend, SimMixer, SoundConfig, create_audio_manager,
};

const THEME: ClipId = ClipId(1);
const STINGER: ClipId = ClipId(2);
const STEP: ClipId = ClipId(3);

const FRAME: Duration = Duration::from_millis(16);

struct Rig {
    handle: AudioManagerHandle,
    manager: AudioManager<SimAudioBackend, SimMixer>,
    clock: ManualClock,
}

impl Rig {
    fn new(pool: PoolPolicy) -> Self {
        let config = AudioManagerConfig::new()
            .with_mixer(
                MixerConfig::new("master")
                    .with_group("Music", "Master/Music")
                    .with_group("Footsteps", "Master/Sfx/Footsteps")
                    .with_parameter("Volume", "master_volume")
                    .with_parameter("MusicVolume", "music_volume"),
            )
            .with_mixer(MixerConfig::new("fx").with_parameter("Lowpass", "lowpass_cutoff"))
            .with_music_group("Music")
            .with_pool(pool);

        let mut mixer = SimMixer::new();
        mixer.insert("master", "master_volume", 0.0);
        mixer.insert("master", "music_volume", 0.0);
        mixer.insert("fx", "lowpass_cutoff", 22000.0);

        let backend = SimAudioBackend::new()
            .with_clip(THEME, 1.0)
            .with_clip(STINGER, 0.5)
            .with_clip(STEP, 0.2);
        let clock = ManualClock::new();

        let (handle, manager) =
            create_audio_manager(&config, backend, mixer, clock.clone()).unwrap();
        Self {
            handle,
            manager,
            clock,
        }
    }

    /// Advance clock and voices by one frame, then tick
    fn frame(&mut self) {
        self.clock.advance(FRAME);
        self.manager.backend_mut().advance(FRAME.as_secs_f32());
        self.manager.tick();
    }

    fn run_for(&mut self, duration: Duration) {
        let frames = duration.as_millis().div_ceil(FRAME.as_millis());
        for _ in 0..frames {
            self.frame();
        }
    }

    fn value(&self, id: &str) -> f32 {
        self.manager.get_parameter(&ParameterId::from(id)).unwrap()
    }
}

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// FADES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn fade_lands_exactly_on_target() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));

    rig.manager
        .start_fade(FadeRequest::new("Volume", 0.5).with_duration(Duration::from_secs(2)))
        .unwrap();
    rig.run_for(Duration::from_millis(2100));

    assert_eq!(rig.value("Volume"), 0.5);
    assert!(!rig.manager.fades().is_fading(&"Volume".into()));
}

#[test]
fn second_fade_without_abort_is_ignored() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));

    rig.manager
        .start_fade(FadeRequest::new("Volume", -20.0).with_duration(Duration::from_secs(1)))
        .unwrap();
    rig.frame();

    let second = rig
        .manager
        .start_fade(FadeRequest::new("Volume", 6.0).with_duration(Duration::from_millis(10)));
    assert_eq!(second, Err(FadeError::Busy("Volume".into())));

    rig.run_for(Duration::from_millis(1100));
    assert_eq!(rig.value("Volume"), -20.0);
}

#[test]
fn abort_existing_replaces_running_fade() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let (first, first_cb) = counter();
    let (second, second_cb) = counter();

    rig.manager
        .start_fade(
            FadeRequest::new("MusicVolume", -80.0)
                .with_duration(Duration::from_secs(4))
                .on_complete(first_cb),
        )
        .unwrap();
    rig.run_for(Duration::from_millis(500));

    rig.manager
        .start_fade(
            FadeRequest::new("MusicVolume", 0.0)
                .with_duration(Duration::from_millis(300))
                .with_easing(FadeCurve::Sine)
                .abort_existing(true)
                .on_complete(second_cb),
        )
        .unwrap();
    rig.run_for(Duration::from_secs(5));

    assert_eq!(rig.value("MusicVolume"), 0.0);
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn stopped_fade_never_calls_back() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let (count, cb) = counter();

    rig.handle
        .start_fade(
            FadeRequest::new("Lowpass", 500.0)
                .with_duration(Duration::from_millis(400))
                .on_complete(cb),
        )
        .unwrap();
    rig.run_for(Duration::from_millis(100));
    let partial = rig.value("Lowpass");

    rig.handle.stop_fade("Lowpass").unwrap();
    rig.run_for(Duration::from_secs(1));

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(rig.value("Lowpass"), partial);
    assert!(partial < 22000.0 && partial > 500.0);
}

#[test]
fn delayed_formula_fade() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let (count, cb) = counter();

    rig.manager
        .start_fade(
            FadeRequest::new("Volume", -6.0)
                .with_duration(Duration::from_millis(500))
                .with_delay(Duration::from_millis(300))
                .with_easing(Easing::formula(|p| -6.0 * p * p))
                .on_complete(cb),
        )
        .unwrap();

    rig.run_for(Duration::from_millis(250));
    assert_eq!(rig.value("Volume"), 0.0);

    rig.run_for(Duration::from_secs(1));
    assert_eq!(rig.value("Volume"), -6.0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_parameter_is_rejected() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let result = rig.manager.start_fade(FadeRequest::new("Reverb", 1.0));
    assert_eq!(result, Err(FadeError::UnknownParameter("Reverb".into())));
    assert!(rig.manager.get_parameter(&"Reverb".into()).is_err());
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUSIC
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn music_end_callback_fires_once() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let (count, cb) = counter();

    rig.handle.play_music_then(THEME, cb).unwrap();
    rig.run_for(Duration::from_secs(3));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!rig.handle.is_music_playing());
}

#[test]
fn replaced_music_never_calls_back() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let (count, cb) = counter();

    rig.handle.play_music_then(THEME, cb).unwrap();
    rig.run_for(Duration::from_millis(400));

    rig.handle.play_music(STINGER, true).unwrap();
    rig.run_for(Duration::from_secs(3));

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(rig.handle.is_music_playing());
    assert_eq!(rig.manager.music().current_clip(), Some(STINGER));
}

#[test]
fn music_callback_can_queue_next_track() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let queue = rig.handle.clone();

    rig.handle
        .play_music_then(THEME, move || {
            queue.play_music(STINGER, true).unwrap();
        })
        .unwrap();
    rig.run_for(Duration::from_millis(1500));

    assert_eq!(rig.manager.music().current_clip(), Some(STINGER));
    assert!(rig.handle.is_music_playing());
}

// ═══════════════════════════════════════════════════════════════════════════════
// ONE-SHOTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn one_shots_recycle_through_fixed_pool() {
    let mut rig = Rig::new(PoolPolicy::fixed(2));
    let step = SoundConfig::new(STEP, "Footsteps");

    let a = rig.manager.play_sound(&step, Placement::Unplaced).unwrap();
    let b = rig.manager.play_sound(&step, Placement::Unplaced).unwrap();
    assert_ne!(a, b);
    assert_eq!(
        rig.manager.play_sound(&step, Placement::Unplaced),
        Err(DispatchError::NoInstanceAvailable)
    );

    rig.run_for(Duration::from_millis(400));
    assert_eq!(rig.handle.voices_in_use(), 0);
    assert_eq!(rig.manager.dispatcher().pool().free_count(), 2);

    assert!(rig.manager.play_sound(&step, Placement::Unplaced).is_ok());
    // Music voice + the two pooled voices, nothing new
    assert_eq!(rig.manager.backend().created_count(), 3);
}

#[test]
fn growable_pool_adds_one_voice_per_miss() {
    let mut rig = Rig::new(PoolPolicy::growable(1));
    let step = SoundConfig::new(STEP, "Footsteps");

    for expected in 1..=4 {
        rig.manager.play_sound(&step, Placement::Unplaced).unwrap();
        assert_eq!(rig.manager.dispatcher().pool().total_instantiated(), expected);
    }
}

#[test]
fn missing_group_returns_voice_immediately() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let sound = SoundConfig::new(STEP, "Ambience");

    let result = rig.manager.play_sound(&sound, Placement::Unplaced);
    assert_eq!(result, Err(DispatchError::MissingRoute("Ambience".into())));
    assert_eq!(rig.manager.dispatcher().pool().free_count(), 1);
    assert_eq!(rig.manager.backend().playing_count(), 0);
}

#[test]
fn stop_sound_releases_early() {
    let mut rig = Rig::new(PoolPolicy::fixed(1));
    let handle = rig
        .manager
        .play_sound(&SoundConfig::new(STEP, "Footsteps"), Placement::Unplaced)
        .unwrap();

    rig.frame();
    assert!(rig.manager.stop_sound(handle));
    assert!(rig.manager.dispatcher().pool().is_free(handle));

    rig.run_for(Duration::from_millis(500));
    assert_eq!(rig.manager.dispatcher().pool().free_count(), 1);
}

#[test]
fn clear_pool_keeps_playing_voices() {
    let mut rig = Rig::new(PoolPolicy::fixed(3));
    rig.manager
        .play_sound(&SoundConfig::new(STEP, "Footsteps"), Placement::Unplaced)
        .unwrap();

    assert_eq!(rig.manager.clear_pool(), 2);
    rig.run_for(Duration::from_millis(400));

    assert_eq!(rig.manager.dispatcher().pool().free_count(), 1);
    assert_eq!(rig.manager.backend().destroyed_count(), 2);
}
