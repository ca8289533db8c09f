//! Audio Manager
//!
//! Service object tying the pieces together:
//! - parameter registry and fade scheduler
//! - music channel
//! - pooled one-shot dispatcher
//! - command queue for callers on other threads
//!
//! ## Thread Safety Design
//!
//! The manager is split into two parts:
//! - `AudioManagerHandle`: cloneable, `Send + Sync`, only enqueues commands
//!   and reads published counters
//! - `AudioManager`: owns all mutable state, advanced by `tick()` on a single
//!   thread
//!
//! Every state change therefore happens inside one `&mut self` call, in the
//! order commands were queued.

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{AudioBackend, ClipId, Clock, MixerBackend, ParameterId};
use crate::config::AudioManagerConfig;
use crate::dispatcher::{Placement, SoundConfig, TransientSoundDispatcher};
use crate::error::{
    AudioManagerError, AudioManagerResult, DispatchError, FadeError, RegistryError,
};
use crate::fade::{FadeRequest, ParameterFadeScheduler};
use crate::music::MusicChannel;
use crate::pool::PoolHandle;
use crate::registry::ParameterRegistry;
use crate::watch::CompletionCallback;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Commands sent from any thread to the manager
pub enum AudioCommand {
    StartFade(FadeRequest),
    StopFade(ParameterId),
    SetParameter { parameter: ParameterId, value: f32 },
    PlayMusic { clip: ClipId, looping: bool },
    PlayMusicThen {
        clip: ClipId,
        on_complete: Option<CompletionCallback>,
    },
    StopMusic,
    PlaySound {
        sound: SoundConfig,
        placement: Placement,
    },
    ClearPool,
}

impl fmt::Debug for AudioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCommand::StartFade(request) => f.debug_tuple("StartFade").field(request).finish(),
            AudioCommand::StopFade(id) => f.debug_tuple("StopFade").field(id).finish(),
            AudioCommand::SetParameter { parameter, value } => f
                .debug_struct("SetParameter")
                .field("parameter", parameter)
                .field("value", value)
                .finish(),
            AudioCommand::PlayMusic { clip, looping } => f
                .debug_struct("PlayMusic")
                .field("clip", clip)
                .field("looping", looping)
                .finish(),
            AudioCommand::PlayMusicThen { clip, on_complete } => f
                .debug_struct("PlayMusicThen")
                .field("clip", clip)
                .field("on_complete", &on_complete.is_some())
                .finish(),
            AudioCommand::StopMusic => f.write_str("StopMusic"),
            AudioCommand::PlaySound { sound, placement } => f
                .debug_struct("PlaySound")
                .field("sound", sound)
                .field("placement", placement)
                .finish(),
            AudioCommand::ClearPool => f.write_str("ClearPool"),
        }
    }
}

/// What one `tick()` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub now: Duration,
    /// Commands drained from the queue
    pub commands: usize,
    /// Queued commands that failed (already logged)
    pub rejected: usize,
    pub fades_completed: usize,
    /// The music end callback fired
    pub music_ended: bool,
    /// One-shot voices returned to the pool
    pub voices_released: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED STATE (Thread-safe)
// ═══════════════════════════════════════════════════════════════════════════════

/// Default command queue capacity
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// State shared between handles and the manager
struct AudioManagerShared {
    command_tx: Mutex<Producer<AudioCommand>>,
    active_fades: AtomicUsize,
    voices_in_use: AtomicUsize,
    music_playing: AtomicBool,
    ticks: AtomicU64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLE (any thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe command handle
///
/// Commands are applied on the manager's next `tick()`. Counters reflect the
/// state published at the end of the last tick.
#[derive(Clone)]
pub struct AudioManagerHandle {
    shared: Arc<AudioManagerShared>,
}

impl AudioManagerHandle {
    fn push_command(&self, cmd: AudioCommand) -> AudioManagerResult<()> {
        let mut tx = self.shared.command_tx.lock();
        tx.push(cmd).map_err(|_| AudioManagerError::QueueFull)
    }

    pub fn start_fade(&self, request: FadeRequest) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::StartFade(request))
    }

    pub fn stop_fade(&self, parameter: impl Into<ParameterId>) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::StopFade(parameter.into()))
    }

    pub fn set_parameter(
        &self,
        parameter: impl Into<ParameterId>,
        value: f32,
    ) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::SetParameter {
            parameter: parameter.into(),
            value,
        })
    }

    pub fn play_music(&self, clip: ClipId, looping: bool) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::PlayMusic { clip, looping })
    }

    /// Play once and call `on_complete` when the clip ends naturally
    pub fn play_music_then(
        &self,
        clip: ClipId,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::PlayMusicThen {
            clip,
            on_complete: Some(Box::new(on_complete)),
        })
    }

    pub fn stop_music(&self) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::StopMusic)
    }

    pub fn play_sound(&self, sound: SoundConfig, placement: Placement) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::PlaySound { sound, placement })
    }

    pub fn clear_pool(&self) -> AudioManagerResult<()> {
        self.push_command(AudioCommand::ClearPool)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERY METHODS (published by the manager each tick)
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn active_fade_count(&self) -> usize {
        self.shared.active_fades.load(Ordering::Relaxed)
    }

    pub fn voices_in_use(&self) -> usize {
        self.shared.voices_in_use.load(Ordering::Relaxed)
    }

    pub fn is_music_playing(&self) -> bool {
        self.shared.music_playing.load(Ordering::Relaxed)
    }

    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for AudioManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioManagerHandle")
            .field("active_fades", &self.active_fade_count())
            .field("voices_in_use", &self.voices_in_use())
            .field("ticks", &self.tick_count())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO MANAGER (single owner thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// Owns the registry, fades, music channel, dispatcher and both backends
pub struct AudioManager<B: AudioBackend, M: MixerBackend> {
    shared: Arc<AudioManagerShared>,
    command_rx: Consumer<AudioCommand>,
    registry: ParameterRegistry,
    fades: ParameterFadeScheduler,
    music: MusicChannel,
    dispatcher: TransientSoundDispatcher,
    backend: B,
    mixer: M,
    clock: Box<dyn Clock>,
}

impl<B: AudioBackend, M: MixerBackend> AudioManager<B, M> {
    /// Another handle to this manager
    pub fn handle(&self) -> AudioManagerHandle {
        AudioManagerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Advance everything by one step
    ///
    /// Order: queued commands, fades, music end watch, one-shot end watches.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport {
            now,
            ..TickReport::default()
        };

        // 1. Commands
        while let Ok(cmd) = self.command_rx.pop() {
            report.commands += 1;
            if let Err(e) = self.execute(cmd, now) {
                log::debug!("Queued command failed: {}", e);
                report.rejected += 1;
            }
        }

        // 2. Fades
        report.fades_completed = self.fades.tick(now, &mut self.mixer);

        // 3. Music
        report.music_ended = self.music.tick(&self.backend);

        // 4. One-shots
        report.voices_released = self.dispatcher.tick(&mut self.backend);

        // 5. Publish
        self.shared
            .active_fades
            .store(self.fades.active_count(), Ordering::Relaxed);
        self.shared
            .voices_in_use
            .store(self.dispatcher.active_count(), Ordering::Relaxed);
        self.shared
            .music_playing
            .store(self.music.is_playing(&self.backend), Ordering::Relaxed);
        self.shared.ticks.fetch_add(1, Ordering::Relaxed);

        report
    }

    fn execute(&mut self, cmd: AudioCommand, now: Duration) -> AudioManagerResult<()> {
        match cmd {
            AudioCommand::StartFade(request) => {
                self.fades
                    .start_fade(request, now, &self.registry, &self.mixer)?;
            }
            AudioCommand::StopFade(parameter) => {
                self.fades.stop(&parameter);
            }
            AudioCommand::SetParameter { parameter, value } => {
                self.registry.set(&parameter, value, &mut self.mixer)?;
            }
            AudioCommand::PlayMusic { clip, looping } => {
                self.music.play(clip, looping, &mut self.backend);
            }
            AudioCommand::PlayMusicThen { clip, on_complete } => {
                self.music.play_then(clip, on_complete, &mut self.backend);
            }
            AudioCommand::StopMusic => {
                self.music.stop(&mut self.backend);
            }
            AudioCommand::PlaySound { sound, placement } => {
                self.dispatcher
                    .play(&sound, placement, &self.registry, &mut self.backend)?;
            }
            AudioCommand::ClearPool => {
                self.dispatcher.clear_pool(&mut self.backend);
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DIRECT API (owner thread)
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start a fade at the current clock time
    pub fn start_fade(&mut self, request: FadeRequest) -> Result<(), FadeError> {
        let now = self.clock.now();
        self.fades
            .start_fade(request, now, &self.registry, &self.mixer)
    }

    /// Cancel a fade without invoking its callback
    pub fn stop_fade(&mut self, parameter: &ParameterId) -> bool {
        self.fades.stop(parameter)
    }

    pub fn get_parameter(&self, parameter: &ParameterId) -> Result<f32, RegistryError> {
        self.registry.get(parameter, &self.mixer)
    }

    /// Write a parameter directly (a running fade keeps writing over it)
    pub fn set_parameter(&mut self, parameter: &ParameterId, value: f32) -> Result<(), RegistryError> {
        self.registry.set(parameter, value, &mut self.mixer)
    }

    pub fn play_music(&mut self, clip: ClipId, looping: bool) {
        self.music.play(clip, looping, &mut self.backend);
    }

    pub fn play_music_then(&mut self, clip: ClipId, on_complete: Option<CompletionCallback>) {
        self.music.play_then(clip, on_complete, &mut self.backend);
    }

    pub fn stop_music(&mut self) {
        self.music.stop(&mut self.backend);
    }

    pub fn play_sound(
        &mut self,
        sound: &SoundConfig,
        placement: Placement,
    ) -> Result<PoolHandle, DispatchError> {
        self.dispatcher
            .play(sound, placement, &self.registry, &mut self.backend)
    }

    pub fn stop_sound(&mut self, handle: PoolHandle) -> bool {
        self.dispatcher.stop(handle, &mut self.backend)
    }

    /// Destroy idle one-shot voices
    pub fn clear_pool(&mut self) -> usize {
        self.dispatcher.clear_pool(&mut self.backend)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn fades(&self) -> &ParameterFadeScheduler {
        &self.fades
    }

    pub fn music(&self) -> &MusicChannel {
        &self.music
    }

    pub fn dispatcher(&self) -> &TransientSoundDispatcher {
        &self.dispatcher
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut M {
        &mut self.mixer
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FACTORY FUNCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Create an audio manager from a configuration
///
/// Validates the configuration, builds the registry, creates the music voice
/// and pre-instantiates the one-shot pool on `backend`.
///
/// Returns a tuple of:
/// - `AudioManagerHandle`: cloneable handle for any thread
/// - `AudioManager`: the owner, ticked once per frame
pub fn create_audio_manager<B, M, C>(
    config: &AudioManagerConfig,
    mut backend: B,
    mixer: M,
    clock: C,
) -> AudioManagerResult<(AudioManagerHandle, AudioManager<B, M>)>
where
    B: AudioBackend,
    M: MixerBackend,
    C: Clock + 'static,
{
    config.validate()?;
    let registry = ParameterRegistry::from_config(config)?;

    let music_route = config
        .music_group
        .as_ref()
        .and_then(|group| registry.resolve_group(group))
        .cloned();
    let music = MusicChannel::new(music_route, &mut backend);
    let dispatcher = TransientSoundDispatcher::new(config.pool, &mut backend);

    let (command_tx, command_rx) = RingBuffer::new(COMMAND_QUEUE_CAPACITY);
    let shared = Arc::new(AudioManagerShared {
        command_tx: Mutex::new(command_tx),
        active_fades: AtomicUsize::new(0),
        voices_in_use: AtomicUsize::new(0),
        music_playing: AtomicBool::new(false),
        ticks: AtomicU64::new(0),
    });

    log::info!(
        "Audio manager ready: {} parameters, pool {} (growable: {})",
        registry.len(),
        config.pool.initial_count,
        config.pool.growable
    );

    let handle = AudioManagerHandle {
        shared: Arc::clone(&shared),
    };

    let manager = AudioManager {
        shared,
        command_rx,
        registry,
        fades: ParameterFadeScheduler::new(),
        music,
        dispatcher,
        backend,
        mixer,
        clock: Box::new(clock),
    };

    Ok((handle, manager))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
