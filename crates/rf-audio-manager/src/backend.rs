//! Backend Collaborators
//!
//! Traits for the pieces the manager drives but does not own: the voice
//! backend (clip playback), the mixer backend (exposed parameters) and the
//! clock. Identifier newtypes shared by every module live here as well.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatcher::VoiceSettings;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Logical exposed-parameter identifier (e.g. `MasterVolume`)
    ParameterId
);
string_id!(
    /// Mixer (parameter owner) identifier
    MixerId
);
string_id!(
    /// Mixer group identifier (e.g. `Music`, `Footsteps`)
    GroupId
);

/// Backend voice handle (one playback source)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub u32);

/// Backend clip reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u32);

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Voice-level playback backend
pub trait AudioBackend {
    /// Create a new (stopped, clipless) voice
    fn create_voice(&mut self) -> VoiceHandle;

    /// Destroy a voice created by `create_voice`
    fn destroy_voice(&mut self, voice: VoiceHandle);

    /// Assign (or clear) the clip a voice plays
    fn set_clip(&mut self, voice: VoiceHandle, clip: Option<ClipId>);

    /// Apply routing, gain and spatial settings
    fn apply_settings(&mut self, voice: VoiceHandle, settings: &VoiceSettings);

    fn play(&mut self, voice: VoiceHandle);

    fn stop(&mut self, voice: VoiceHandle);

    /// Playback position in seconds, `None` when the voice has no clip
    fn position(&self, voice: VoiceHandle) -> Option<f32>;

    fn is_active(&self, voice: VoiceHandle) -> bool;
}

/// Mixer backend holding exposed parameters
pub trait MixerBackend {
    /// Read an exposed parameter, `None` if the backend refuses
    fn get_parameter(&self, mixer: &MixerId, key: &str) -> Option<f32>;

    /// Write an exposed parameter, `false` if the backend refuses
    fn set_parameter(&mut self, mixer: &MixerId, key: &str, value: f32) -> bool;
}

/// Monotonic time source
pub trait Clock: Send {
    fn now(&self) -> Duration;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock
///
/// Clones share the same time, so a test (or an offline host loop) can keep
/// one copy and hand the other to the manager.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }

    /// Jump to an absolute time (never backwards)
    pub fn set(&self, now: Duration) {
        let mut current = self.now.lock();
        if now > *current {
            *current = now;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
