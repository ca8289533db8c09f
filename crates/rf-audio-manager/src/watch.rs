//! Playback Completion Monitor
//!
//! Detects the natural end of a clip by polling the voice position once per
//! tick, for backends that do not report end-of-clip themselves.
//!
//! ```text
//!   NotStarted ──(position > 0)──▶ Started ──(position == 0 | no clip)──▶ Ended
//! ```
//!
//! A voice whose clip disappears ends the watch in either phase. The payload
//! attached to a watch is handed back exactly once, on the tick it ends;
//! cancelled watches never hand it back.

use std::collections::HashMap;
use std::fmt;

use crate::backend::{AudioBackend, VoiceHandle};

/// One-shot completion handler
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Identifies a registered watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchToken(u64);

/// Watch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchPhase {
    /// Position has not moved past zero yet
    #[default]
    NotStarted,
    /// Position has been > 0 at least once
    Started,
}

/// Result of polling a watch for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPoll {
    Pending,
    Ended,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPLETION WATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-playback end detector
pub struct CompletionWatch<T> {
    voice: VoiceHandle,
    phase: WatchPhase,
    payload: Option<T>,
}

impl<T> CompletionWatch<T> {
    pub fn new(voice: VoiceHandle, payload: T) -> Self {
        Self {
            voice,
            phase: WatchPhase::NotStarted,
            payload: Some(payload),
        }
    }

    pub fn voice(&self) -> VoiceHandle {
        self.voice
    }

    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    /// Advance with this tick's position (`None` = clip absent)
    pub fn poll(&mut self, position: Option<f32>) -> WatchPoll {
        let Some(position) = position else {
            return WatchPoll::Ended;
        };

        match self.phase {
            WatchPhase::NotStarted => {
                if position > 0.0 {
                    self.phase = WatchPhase::Started;
                }
                WatchPoll::Pending
            }
            WatchPhase::Started if position <= 0.0 => WatchPoll::Ended,
            WatchPhase::Started => WatchPoll::Pending,
        }
    }

    /// Take the payload (only once)
    pub fn take_payload(&mut self) -> Option<T> {
        self.payload.take()
    }
}

impl<T> fmt::Debug for CompletionWatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionWatch")
            .field("voice", &self.voice)
            .field("phase", &self.phase)
            .field("armed", &self.payload.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONITOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Set of completion watches advanced together each tick
///
/// A watch only sees positions sampled at tick time. A clip that starts and
/// ends between two ticks never reports a position above zero, so its watch
/// stays `NotStarted` and never fires. Keep clips longer than one tick, or
/// cancel such watches from the owner.
pub struct PlaybackCompletionMonitor<T> {
    watches: HashMap<WatchToken, CompletionWatch<T>>,
    next_token: u64,
}

impl<T> Default for PlaybackCompletionMonitor<T> {
    fn default() -> Self {
        Self {
            watches: HashMap::new(),
            next_token: 1,
        }
    }
}

impl<T> PlaybackCompletionMonitor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching a voice
    pub fn watch(&mut self, voice: VoiceHandle, on_complete: T) -> WatchToken {
        let token = WatchToken(self.next_token);
        self.next_token += 1;
        self.watches
            .insert(token, CompletionWatch::new(voice, on_complete));
        token
    }

    /// Stop watching; the payload is returned to the caller and never fires
    ///
    /// Unknown, retired or already-cancelled tokens are a no-op.
    pub fn cancel_watch(&mut self, token: WatchToken) -> Option<T> {
        self.watches
            .remove(&token)
            .and_then(|mut watch| watch.take_payload())
    }

    /// Poll every watch once; ended watches are retired and their payloads
    /// returned
    pub fn tick<B: AudioBackend + ?Sized>(&mut self, backend: &B) -> Vec<(WatchToken, T)> {
        let ended: Vec<WatchToken> = self
            .watches
            .iter_mut()
            .filter_map(|(token, watch)| {
                match watch.poll(backend.position(watch.voice)) {
                    WatchPoll::Ended => Some(*token),
                    WatchPoll::Pending => None,
                }
            })
            .collect();

        ended
            .into_iter()
            .filter_map(|token| {
                let payload = self.watches.remove(&token)?.take_payload()?;
                Some((token, payload))
            })
            .collect()
    }

    /// Token of the first live watch whose payload matches
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<WatchToken> {
        self.watches
            .iter()
            .find(|(_, watch)| watch.payload.as_ref().is_some_and(&mut predicate))
            .map(|(token, _)| *token)
    }

    pub fn is_watching(&self, token: WatchToken) -> bool {
        self.watches.contains_key(&token)
    }

    pub fn phase(&self, token: WatchToken) -> Option<WatchPhase> {
        self.watches.get(&token).map(|w| w.phase)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

impl PlaybackCompletionMonitor<CompletionCallback> {
    /// Tick and invoke every completion callback that fired
    pub fn tick_and_invoke<B: AudioBackend + ?Sized>(&mut self, backend: &B) -> usize {
        let fired = self.tick(backend);
        let count = fired.len();
        for (_, callback) in fired {
            callback();
        }
        count
    }
}

impl<T> fmt::Debug for PlaybackCompletionMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCompletionMonitor")
            .field("watches", &self.watches.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
