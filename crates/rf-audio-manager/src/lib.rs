//! FluxForge Audio Manager
//!
//! Game-facing audio control layer on top of a voice backend and a mixer:
//! - Timed fades of exposed mixer parameters with curves or custom formulas
//! - Single-slot music channel with end-of-track callbacks
//! - Pooled fire-and-forget one-shots, returned to the pool when they end
//! - Lock-free command queue for callers on other threads
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    AUDIO MANAGER ARCHITECTURE                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   Any Thread                          Owner Thread (per frame)   │
//! │   ┌─────────────────┐                ┌─────────────────┐        │
//! │   │ start_fade()    │                │ AudioManager    │        │
//! │   │ play_music()    │───Command──────▶│ .tick()        │        │
//! │   │ play_sound()    │   Queue        │                 │        │
//! │   │ set_parameter() │  (lock-free)   │                 │        │
//! │   └─────────────────┘                └────────┬────────┘        │
//! │                                               │                  │
//! │          ┌──────────────────┬─────────────────┼──────────┐      │
//! │          ▼                  ▼                 ▼          │      │
//! │   ┌─────────────┐   ┌──────────────┐  ┌──────────────┐   │      │
//! │   │ Fade        │   │ MusicChannel │  │ Transient    │   │      │
//! │   │ Scheduler   │   │ + end watch  │  │ Dispatcher   │   │      │
//! │   └──────┬──────┘   └──────┬───────┘  │ + pool       │   │      │
//! │          │                 │          └──────┬───────┘   │      │
//! │          ▼                 ▼                 ▼           │      │
//! │   ┌─────────────┐   ┌──────────────────────────────┐     │      │
//! │   │ MixerBackend│   │ AudioBackend (voices)        │     │      │
//! │   └─────────────┘   └──────────────────────────────┘     │      │
//! │                                                                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use rf_audio_manager::{
//!     AudioManagerConfig, ClipId, FadeRequest, ManualClock, MixerConfig, Placement,
//!     SimAudioBackend, SimMixer, SoundConfig, create_audio_manager,
//! };
//! use std::time::Duration;
//!
//! let config = AudioManagerConfig::new()
//!     .with_mixer(
//!         MixerConfig::new("master")
//!             .with_group("Sfx", "Master/Sfx")
//!             .with_parameter("MasterVolume", "master_volume"),
//!     );
//!
//! let mut mixer = SimMixer::new();
//! mixer.insert("master", "master_volume", 0.0);
//! let backend = SimAudioBackend::new().with_clip(ClipId(1), 0.5);
//! let clock = ManualClock::new();
//!
//! let (handle, mut manager) =
//!     create_audio_manager(&config, backend, mixer, clock.clone()).unwrap();
//!
//! handle
//!     .start_fade(FadeRequest::new("MasterVolume", -80.0).with_duration(Duration::from_secs(2)))
//!     .unwrap();
//! handle.play_sound(SoundConfig::new(ClipId(1), "Sfx"), Placement::Unplaced).unwrap();
//!
//! // Once per frame
//! clock.advance(Duration::from_millis(16));
//! let report = manager.tick();
//! assert_eq!(report.commands, 2);
//! ```

#![allow(clippy::new_without_default)]

pub mod backend;
pub mod config;
pub mod curve;
pub mod dispatcher;
pub mod error;
pub mod fade;
pub mod manager;
pub mod music;
pub mod pool;
pub mod registry;
pub mod sim;
pub mod units;
pub mod watch;

// Re-exports
pub use backend::{
    AudioBackend, ClipId, Clock, GroupId, ManualClock, MixerBackend, MixerId, ParameterId,
    SystemClock, VoiceHandle,
};
pub use config::{AudioManagerConfig, GroupConfig, MixerConfig, ParameterConfig};
pub use curve::{CurveKey, Easing, FadeCurve, FadeFormula, KeyframeCurve};
pub use dispatcher::{
    EmitterId, Placement, Position, Rolloff, SoundConfig, SourceSettings,
    TransientSoundDispatcher, VoiceSettings,
};
pub use error::{
    AudioManagerError, AudioManagerResult, ConfigError, DispatchError, FadeError, PoolError,
    RegistryError,
};
pub use fade::{FadeRequest, FadeState, FadeTask, ParameterFadeScheduler};
pub use manager::{
    AudioCommand, AudioManager, AudioManagerHandle, COMMAND_QUEUE_CAPACITY, TickReport,
    create_audio_manager,
};
pub use music::MusicChannel;
pub use pool::{InstanceState, PoolHandle, PoolId, PoolPolicy, ResourcePool};
pub use registry::{ExposedParameter, MixerGroup, ParameterRegistry};
pub use sim::{SimAudioBackend, SimMixer};
pub use watch::{
    CompletionCallback, CompletionWatch, PlaybackCompletionMonitor, WatchPhase, WatchPoll,
    WatchToken,
};
