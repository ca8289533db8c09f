//! Transient Sound Dispatcher
//!
//! Fire-and-forget one-shots on pooled voices:
//! - acquire a voice from the pool
//! - route it to its mixer group and apply the source settings
//! - start playback and watch for the natural end
//! - reset and return the voice to the pool once the clip ends
//!
//! Every failure here is soft: it is logged, the voice (if any) goes back to
//! the pool, and the caller gets a `DispatchError`.

use serde::{Deserialize, Serialize};

use crate::backend::{AudioBackend, ClipId, GroupId, VoiceHandle};
use crate::curve::KeyframeCurve;
use crate::error::DispatchError;
use crate::pool::{PoolHandle, PoolPolicy, ResourcePool};
use crate::registry::{MixerGroup, ParameterRegistry};
use crate::watch::{PlaybackCompletionMonitor, WatchToken};

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Distance attenuation model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Rolloff {
    #[default]
    Logarithmic,
    Linear,
    /// Authored curve (normalized distance → gain)
    Custom(KeyframeCurve),
}

/// Gain, pitch and spatial settings of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// 0 = highest, 256 = lowest
    pub priority: u16,
    pub volume: f32,
    pub pitch: f32,
    /// -1 (left) to 1 (right)
    pub stereo_pan: f32,
    /// 0 = 2D, 1 = fully 3D
    pub spatial_blend: f32,
    pub reverb_mix: f32,
    pub doppler_level: f32,
    /// Spread angle in degrees
    pub spread: f32,
    pub rolloff: Rolloff,
    pub min_distance: f32,
    pub max_distance: f32,
    pub bypass_effects: bool,
    pub bypass_listener_effects: bool,
    pub bypass_reverb_zones: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            priority: 128,
            volume: 1.0,
            pitch: 1.0,
            stereo_pan: 0.0,
            spatial_blend: 0.0,
            reverb_mix: 1.0,
            doppler_level: 1.0,
            spread: 0.0,
            rolloff: Rolloff::Logarithmic,
            min_distance: 1.0,
            max_distance: 500.0,
            bypass_effects: false,
            bypass_listener_effects: false,
            bypass_reverb_zones: false,
        }
    }
}

impl SourceSettings {
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_spatial_blend(mut self, blend: f32) -> Self {
        self.spatial_blend = blend.clamp(0.0, 1.0);
        self
    }

    pub fn with_rolloff(mut self, rolloff: Rolloff) -> Self {
        self.rolloff = rolloff;
        self
    }

    /// Copy with value ranges clamped and an unusable custom rolloff replaced
    /// by `Logarithmic`
    pub fn sanitized(&self) -> Self {
        let mut settings = self.clone();
        settings.priority = settings.priority.min(256);
        settings.volume = settings.volume.clamp(0.0, 1.0);
        settings.pitch = settings.pitch.clamp(-3.0, 3.0);
        settings.stereo_pan = settings.stereo_pan.clamp(-1.0, 1.0);
        settings.spatial_blend = settings.spatial_blend.clamp(0.0, 1.0);
        settings.reverb_mix = settings.reverb_mix.clamp(0.0, 1.1);
        settings.doppler_level = settings.doppler_level.clamp(0.0, 5.0);
        settings.spread = settings.spread.clamp(0.0, 360.0);
        settings.min_distance = settings.min_distance.max(0.0);
        settings.max_distance = settings.max_distance.max(settings.min_distance);

        if let Rolloff::Custom(curve) = &settings.rolloff {
            if curve.is_empty() {
                log::error!("Custom rolloff has no curve points, using Logarithmic");
                settings.rolloff = Rolloff::Logarithmic;
            }
        }

        settings
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLACEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Host-side object a voice can follow
pub type EmitterId = u64;

/// Where a voice plays from
///
/// Following an emitter is left to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Placement {
    /// No position (2D)
    #[default]
    Unplaced,
    /// Fixed point
    At(Position),
    /// Follows an emitter with an offset
    Attached { emitter: EmitterId, offset: Position },
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOUND CONFIG / VOICE SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything needed to fire a one-shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    pub clip: Option<ClipId>,
    pub group: GroupId,
    #[serde(default)]
    pub source: SourceSettings,
}

impl SoundConfig {
    pub fn new(clip: ClipId, group: impl Into<GroupId>) -> Self {
        Self {
            clip: Some(clip),
            group: group.into(),
            source: SourceSettings::default(),
        }
    }

    pub fn with_source(mut self, source: SourceSettings) -> Self {
        self.source = source;
        self
    }
}

/// Settings pushed to a voice before playback
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Output destination (`None` = backend default output)
    pub route: Option<MixerGroup>,
    pub looping: bool,
    pub source: SourceSettings,
    pub placement: Placement,
}

impl VoiceSettings {
    pub fn new(route: Option<MixerGroup>) -> Self {
        Self {
            route,
            looping: false,
            source: SourceSettings::default(),
            placement: Placement::Unplaced,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCHER
// ═══════════════════════════════════════════════════════════════════════════════

/// Pooled one-shot player
#[derive(Debug)]
pub struct TransientSoundDispatcher {
    pool: ResourcePool<VoiceHandle>,
    monitor: PlaybackCompletionMonitor<PoolHandle>,
}

impl TransientSoundDispatcher {
    /// Create the pool, instantiating its initial voices on `backend`
    pub fn new<B: AudioBackend + ?Sized>(policy: PoolPolicy, backend: &mut B) -> Self {
        Self {
            pool: ResourcePool::initialize(policy, || backend.create_voice()),
            monitor: PlaybackCompletionMonitor::new(),
        }
    }

    /// Fire a one-shot
    ///
    /// The voice is released immediately if its mixer group cannot be
    /// resolved. On success the returned handle stays in use until the clip
    /// ends or `stop` is called.
    pub fn play<B: AudioBackend + ?Sized>(
        &mut self,
        sound: &SoundConfig,
        placement: Placement,
        registry: &ParameterRegistry,
        backend: &mut B,
    ) -> Result<PoolHandle, DispatchError> {
        let Some(clip) = sound.clip else {
            log::warn!("Sound for group {} has no clip", sound.group);
            return Err(DispatchError::MissingClip);
        };

        let Some(handle) = self.pool.acquire(|| backend.create_voice()) else {
            log::info!("No pooled voice available, is the pool set to not grow?");
            return Err(DispatchError::NoInstanceAvailable);
        };
        let Some(&voice) = self.pool.get(handle) else {
            return Err(DispatchError::NoInstanceAvailable);
        };

        let Some(route) = registry.resolve_group(&sound.group) else {
            log::warn!("No mixer group found for {}", sound.group);
            self.recycle(handle, voice, backend);
            return Err(DispatchError::MissingRoute(sound.group.clone()));
        };

        let settings = VoiceSettings {
            route: Some(route.clone()),
            looping: false,
            source: sound.source.sanitized(),
            placement,
        };
        backend.apply_settings(voice, &settings);
        backend.set_clip(voice, Some(clip));
        backend.play(voice);

        self.monitor.watch(voice, handle);
        log::trace!("One-shot {:?} on {}: {:?}", clip, route.bus, voice);

        Ok(handle)
    }

    /// Stop a one-shot early and return its voice to the pool
    ///
    /// Returns `false` for handles that are not currently playing.
    pub fn stop<B: AudioBackend + ?Sized>(&mut self, handle: PoolHandle, backend: &mut B) -> bool {
        let Some(token) = self.watch_for(handle) else {
            return false;
        };
        self.monitor.cancel_watch(token);

        match self.pool.get(handle).copied() {
            Some(voice) => {
                self.recycle(handle, voice, backend);
                true
            }
            None => false,
        }
    }

    /// Release every voice whose clip ended this tick
    pub fn tick<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let ended = self.monitor.tick(&*backend);
        let count = ended.len();
        for (_, handle) in ended {
            if let Some(voice) = self.pool.get(handle).copied() {
                self.recycle(handle, voice, backend);
            }
        }
        count
    }

    /// Destroy idle voices (playing voices are kept)
    pub fn clear_pool<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        self.pool.clear(|voice| backend.destroy_voice(voice))
    }

    fn recycle<B: AudioBackend + ?Sized>(
        &mut self,
        handle: PoolHandle,
        voice: VoiceHandle,
        backend: &mut B,
    ) {
        backend.stop(voice);
        backend.set_clip(voice, None);
        if let Err(e) = self.pool.release(handle) {
            log::warn!("Voice {:?} not returned to pool: {}", voice, e);
        }
    }

    fn watch_for(&self, handle: PoolHandle) -> Option<WatchToken> {
        self.monitor.find(|h| *h == handle)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn pool(&self) -> &ResourcePool<VoiceHandle> {
        &self.pool
    }

    pub fn voice(&self, handle: PoolHandle) -> Option<VoiceHandle> {
        self.pool.get(handle).copied()
    }

    pub fn is_playing(&self, handle: PoolHandle) -> bool {
        self.watch_for(handle).is_some()
    }

    /// Voices currently playing one-shots
    pub fn active_count(&self) -> usize {
        self.pool.in_use_count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::InstanceState;
    use crate::sim::SimAudioBackend;

    const CLICK: ClipId = ClipId(7);

    fn setup(policy: PoolPolicy) -> (TransientSoundDispatcher, ParameterRegistry, SimAudioBackend) {
        let mut backend = SimAudioBackend::new();
        backend.register_clip(CLICK, 0.5);

        let mut registry = ParameterRegistry::new();
        registry
            .register_group("Sfx".into(), "master".into(), "Master/Sfx")
            .unwrap();

        let dispatcher = TransientSoundDispatcher::new(policy, &mut backend);
        (dispatcher, registry, backend)
    }

    #[test]
    fn test_play_configures_voice() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(2));
        let sound = SoundConfig::new(CLICK, "Sfx")
            .with_source(SourceSettings::default().with_volume(0.5).with_spatial_blend(1.0));

        let handle = dispatcher
            .play(&sound, Placement::At(Position::new(1.0, 2.0, 3.0)), &registry, &mut backend)
            .unwrap();
        let voice = dispatcher.voice(handle).unwrap();

        assert!(backend.is_active(voice));
        assert_eq!(backend.clip(voice), Some(CLICK));

        let settings = backend.settings(voice).unwrap();
        assert_eq!(settings.route.as_ref().unwrap().bus, "Master/Sfx");
        assert_eq!(settings.source.volume, 0.5);
        assert_eq!(settings.placement, Placement::At(Position::new(1.0, 2.0, 3.0)));
        assert!(!settings.looping);
        assert!(dispatcher.is_playing(handle));
    }

    #[test]
    fn test_missing_route_releases_immediately() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(1));
        let sound = SoundConfig::new(CLICK, "Ambience");

        let result = dispatcher.play(&sound, Placement::Unplaced, &registry, &mut backend);
        assert_eq!(result, Err(DispatchError::MissingRoute("Ambience".into())));
        assert_eq!(dispatcher.pool().free_count(), 1);
        assert_eq!(dispatcher.active_count(), 0);

        // The voice is usable again right away
        let ok = dispatcher.play(&SoundConfig::new(CLICK, "Sfx"), Placement::Unplaced, &registry, &mut backend);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_missing_clip_acquires_nothing() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(1));
        let mut sound = SoundConfig::new(CLICK, "Sfx");
        sound.clip = None;

        let result = dispatcher.play(&sound, Placement::Unplaced, &registry, &mut backend);
        assert_eq!(result, Err(DispatchError::MissingClip));
        assert_eq!(dispatcher.pool().free_count(), 1);
    }

    #[test]
    fn test_exhausted_fixed_pool() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(1));
        let sound = SoundConfig::new(CLICK, "Sfx");

        dispatcher.play(&sound, Placement::Unplaced, &registry, &mut backend).unwrap();
        let second = dispatcher.play(&sound, Placement::Unplaced, &registry, &mut backend);
        assert_eq!(second, Err(DispatchError::NoInstanceAvailable));
    }

    #[test]
    fn test_natural_end_returns_voice() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(1));
        let handle = dispatcher
            .play(&SoundConfig::new(CLICK, "Sfx"), Placement::Unplaced, &registry, &mut backend)
            .unwrap();
        let voice = dispatcher.voice(handle).unwrap();

        let mut released = 0;
        for _ in 0..40 {
            backend.advance(0.02);
            released += dispatcher.tick(&mut backend);
        }

        assert_eq!(released, 1);
        assert_eq!(dispatcher.pool().state(handle), Some(InstanceState::Free));
        assert_eq!(backend.clip(voice), None);
        assert!(!backend.is_active(voice));
    }

    #[test]
    fn test_stop_early() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(2));
        let handle = dispatcher
            .play(&SoundConfig::new(CLICK, "Sfx"), Placement::Unplaced, &registry, &mut backend)
            .unwrap();

        assert!(dispatcher.stop(handle, &mut backend));
        assert!(!dispatcher.stop(handle, &mut backend));
        assert!(dispatcher.pool().is_free(handle));

        // No late release from the cancelled watch
        for _ in 0..40 {
            backend.advance(0.02);
            assert_eq!(dispatcher.tick(&mut backend), 0);
        }
        assert_eq!(dispatcher.pool().free_count(), 2);
    }

    #[test]
    fn test_clear_pool_destroys_idle_voices() {
        let (mut dispatcher, registry, mut backend) = setup(PoolPolicy::fixed(3));
        dispatcher
            .play(&SoundConfig::new(CLICK, "Sfx"), Placement::Unplaced, &registry, &mut backend)
            .unwrap();

        assert_eq!(dispatcher.clear_pool(&mut backend), 2);
        assert_eq!(backend.voice_count(), 1);
    }

    #[test]
    fn test_custom_rolloff_without_curve_falls_back() {
        let settings = SourceSettings::default()
            .with_rolloff(Rolloff::Custom(KeyframeCurve::new()))
            .with_volume(3.0);
        let sanitized = settings.sanitized();
        assert_eq!(sanitized.rolloff, Rolloff::Logarithmic);
        assert_eq!(sanitized.volume, 1.0);

        let curve = KeyframeCurve::from_keys([(0.0, 1.0), (1.0, 0.0)]);
        let kept = SourceSettings::default()
            .with_rolloff(Rolloff::Custom(curve.clone()))
            .sanitized();
        assert_eq!(kept.rolloff, Rolloff::Custom(curve));
    }

    #[test]
    fn test_sound_config_from_json() {
        let sound: SoundConfig =
            serde_json::from_str(r#"{ "clip": 7, "group": "Sfx", "source": { "volume": 0.25 } }"#)
                .unwrap();
        assert_eq!(sound.clip, Some(CLICK));
        assert_eq!(sound.source.volume, 0.25);
        assert_eq!(sound.source.pitch, 1.0);
    }
}
