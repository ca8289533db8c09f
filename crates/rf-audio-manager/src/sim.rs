//! Simulated Backends
//!
//! Deterministic in-memory implementations of [`AudioBackend`] and
//! [`MixerBackend`]. Nothing is rendered: voices only track clip, play state
//! and position, which [`SimAudioBackend::advance`] moves forward.
//!
//! Used by the tests and by the `rf-audio-sim` binary.

use std::collections::HashMap;

use crate::backend::{AudioBackend, ClipId, MixerBackend, MixerId, VoiceHandle};
use crate::dispatcher::VoiceSettings;

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
struct SimVoice {
    clip: Option<ClipId>,
    playing: bool,
    position: f32,
    settings: Option<VoiceSettings>,
    play_count: u32,
}

/// Voice backend driven by explicit time steps
#[derive(Debug, Default)]
pub struct SimAudioBackend {
    voices: HashMap<VoiceHandle, SimVoice>,
    /// Clip lengths in seconds
    clips: HashMap<ClipId, f32>,
    next_voice: u32,
    created: usize,
    destroyed: usize,
}

impl SimAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a clip and its length
    pub fn register_clip(&mut self, clip: ClipId, length_secs: f32) {
        self.clips.insert(clip, length_secs.max(0.0));
    }

    pub fn with_clip(mut self, clip: ClipId, length_secs: f32) -> Self {
        self.register_clip(clip, length_secs);
        self
    }

    /// Move every playing voice forward by `dt` seconds
    ///
    /// A non-looping voice that reaches the end of its clip stops and rewinds
    /// to zero; a looping voice wraps.
    pub fn advance(&mut self, dt: f32) {
        for voice in self.voices.values_mut() {
            if !voice.playing {
                continue;
            }
            let Some(length) = voice.clip.and_then(|c| self.clips.get(&c).copied()) else {
                continue;
            };
            let looping = voice.settings.as_ref().is_some_and(|s| s.looping);

            voice.position += dt;
            if voice.position >= length {
                if looping && length > 0.0 {
                    voice.position %= length;
                } else {
                    voice.position = 0.0;
                    voice.playing = false;
                }
            }
        }
    }

    /// Force a voice's playback position
    pub fn set_position(&mut self, voice: VoiceHandle, position: f32) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.position = position;
        }
    }

    pub fn clip(&self, voice: VoiceHandle) -> Option<ClipId> {
        self.voices.get(&voice).and_then(|v| v.clip)
    }

    pub fn settings(&self, voice: VoiceHandle) -> Option<&VoiceSettings> {
        self.voices.get(&voice).and_then(|v| v.settings.as_ref())
    }

    /// Number of `play` calls a voice has received
    pub fn play_count(&self, voice: VoiceHandle) -> u32 {
        self.voices.get(&voice).map_or(0, |v| v.play_count)
    }

    /// Voices that currently exist
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn playing_count(&self) -> usize {
        self.voices.values().filter(|v| v.playing).count()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }
}

impl AudioBackend for SimAudioBackend {
    fn create_voice(&mut self) -> VoiceHandle {
        self.next_voice += 1;
        let handle = VoiceHandle(self.next_voice);
        self.voices.insert(handle, SimVoice::default());
        self.created += 1;
        handle
    }

    fn destroy_voice(&mut self, voice: VoiceHandle) {
        if self.voices.remove(&voice).is_some() {
            self.destroyed += 1;
        }
    }

    fn set_clip(&mut self, voice: VoiceHandle, clip: Option<ClipId>) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.clip = clip;
            v.position = 0.0;
            if clip.is_none() {
                v.playing = false;
            }
        }
    }

    fn apply_settings(&mut self, voice: VoiceHandle, settings: &VoiceSettings) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.settings = Some(settings.clone());
        }
    }

    fn play(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voices.get_mut(&voice) {
            if v.clip.is_some() {
                v.playing = true;
                v.position = 0.0;
                v.play_count += 1;
            }
        }
    }

    fn stop(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.playing = false;
            v.position = 0.0;
        }
    }

    fn position(&self, voice: VoiceHandle) -> Option<f32> {
        let v = self.voices.get(&voice)?;
        v.clip.map(|_| v.position)
    }

    fn is_active(&self, voice: VoiceHandle) -> bool {
        self.voices.get(&voice).is_some_and(|v| v.playing)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MIXER BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory mixer parameter table
#[derive(Debug, Clone, Default)]
pub struct SimMixer {
    values: HashMap<(MixerId, String), f32>,
    read_only: bool,
    writes: usize,
}

impl SimMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a parameter with an initial value
    pub fn insert(&mut self, mixer: &str, key: &str, value: f32) {
        self.values.insert((MixerId::from(mixer), key.to_string()), value);
    }

    pub fn value(&self, mixer: &str, key: &str) -> Option<f32> {
        self.values
            .get(&(MixerId::from(mixer), key.to_string()))
            .copied()
    }

    /// Refuse every write
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl MixerBackend for SimMixer {
    fn get_parameter(&self, mixer: &MixerId, key: &str) -> Option<f32> {
        self.values.get(&(mixer.clone(), key.to_string())).copied()
    }

    fn set_parameter(&mut self, mixer: &MixerId, key: &str, value: f32) -> bool {
        if self.read_only {
            return false;
        }
        match self.values.get_mut(&(mixer.clone(), key.to_string())) {
            Some(slot) => {
                *slot = value;
                self.writes += 1;
                true
            }
            None => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
