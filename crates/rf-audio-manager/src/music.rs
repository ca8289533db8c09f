//! Music Channel
//!
//! A single persistent voice for background music. Starting new music always
//! stops the current track first and cancels its completion watch, so a
//! replaced track never reports its end.

use crate::backend::{AudioBackend, ClipId, VoiceHandle};
use crate::dispatcher::VoiceSettings;
use crate::registry::MixerGroup;
use crate::watch::{CompletionCallback, PlaybackCompletionMonitor, WatchToken};

/// Single-slot music player
#[derive(Debug)]
pub struct MusicChannel {
    voice: VoiceHandle,
    route: Option<MixerGroup>,
    current_clip: Option<ClipId>,
    looping: bool,
    monitor: PlaybackCompletionMonitor<CompletionCallback>,
    watch: Option<WatchToken>,
}

impl MusicChannel {
    /// Create the channel's voice, routed to `route` when given
    pub fn new<B: AudioBackend + ?Sized>(route: Option<MixerGroup>, backend: &mut B) -> Self {
        if route.is_none() {
            log::warn!("No music mixer group assigned, music plays on the default output");
        }

        Self {
            voice: backend.create_voice(),
            route,
            current_clip: None,
            looping: false,
            monitor: PlaybackCompletionMonitor::new(),
            watch: None,
        }
    }

    /// Stop whatever is playing and start `clip`
    pub fn play<B: AudioBackend + ?Sized>(&mut self, clip: ClipId, looping: bool, backend: &mut B) {
        self.start(clip, looping, backend);
    }

    /// Stop whatever is playing and start `clip` once, invoking `on_complete`
    /// when it ends naturally
    ///
    /// Without a callback the clip still plays, unwatched.
    pub fn play_then<B: AudioBackend + ?Sized>(
        &mut self,
        clip: ClipId,
        on_complete: Option<CompletionCallback>,
        backend: &mut B,
    ) {
        self.start(clip, false, backend);

        match on_complete {
            Some(callback) => self.watch = Some(self.monitor.watch(self.voice, callback)),
            None => log::warn!("No music end callback, nothing will happen after {:?}", clip),
        }
    }

    /// Stop playback and cancel any pending end callback
    pub fn stop<B: AudioBackend + ?Sized>(&mut self, backend: &mut B) {
        backend.stop(self.voice);
        self.current_clip = None;
        if let Some(token) = self.watch.take() {
            self.monitor.cancel_watch(token);
        }
    }

    fn start<B: AudioBackend + ?Sized>(&mut self, clip: ClipId, looping: bool, backend: &mut B) {
        self.stop(backend);

        let settings = VoiceSettings::new(self.route.clone()).with_looping(looping);
        backend.apply_settings(self.voice, &settings);
        backend.set_clip(self.voice, Some(clip));
        backend.play(self.voice);

        self.current_clip = Some(clip);
        self.looping = looping;
        log::debug!("Music {:?} started (loop: {})", clip, looping);
    }

    /// Poll the end watch; returns `true` if the end callback fired
    pub fn tick<B: AudioBackend + ?Sized>(&mut self, backend: &B) -> bool {
        if self.watch.is_none() {
            return false;
        }

        let fired = self.monitor.tick(backend);
        let mut ended = false;
        for (token, callback) in fired {
            if self.watch == Some(token) {
                self.watch = None;
                self.current_clip = None;
                ended = true;
            }
            callback();
        }
        ended
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn voice(&self) -> VoiceHandle {
        self.voice
    }

    pub fn route(&self) -> Option<&MixerGroup> {
        self.route.as_ref()
    }

    pub fn current_clip(&self) -> Option<ClipId> {
        self.current_clip
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_playing<B: AudioBackend + ?Sized>(&self, backend: &B) -> bool {
        backend.is_active(self.voice)
    }

    /// An end callback is pending
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimAudioBackend;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const THEME: ClipId = ClipId(1);
    const BATTLE: ClipId = ClipId(2);

    fn backend() -> SimAudioBackend {
        SimAudioBackend::new()
            .with_clip(THEME, 1.0)
            .with_clip(BATTLE, 2.0)
    }

    fn route() -> MixerGroup {
        MixerGroup {
            id: "Music".into(),
            mixer: "master".into(),
            bus: "Master/Music".into(),
        }
    }

    fn counting_callback(count: &Arc<AtomicUsize>) -> CompletionCallback {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn run(channel: &mut MusicChannel, backend: &mut SimAudioBackend, secs: f32) {
        let steps = (secs / 0.05).ceil() as usize;
        for _ in 0..steps {
            backend.advance(0.05);
            channel.tick(&*backend);
        }
    }

    #[test]
    fn test_natural_end_fires_once() {
        let mut backend = backend();
        let mut channel = MusicChannel::new(Some(route()), &mut backend);
        let count = Arc::new(AtomicUsize::new(0));

        channel.play_then(THEME, Some(counting_callback(&count)), &mut backend);
        assert!(channel.is_watching());
        assert_eq!(backend.settings(channel.voice()).unwrap().route, Some(route()));

        run(&mut channel, &mut backend, 3.0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!channel.is_watching());
        assert_eq!(channel.current_clip(), None);
        assert!(!channel.is_playing(&backend));
    }

    #[test]
    fn test_replacing_before_end_cancels_callback() {
        let mut backend = backend();
        let mut channel = MusicChannel::new(Some(route()), &mut backend);
        let first = Arc::new(AtomicUsize::new(0));

        channel.play_then(THEME, Some(counting_callback(&first)), &mut backend);
        run(&mut channel, &mut backend, 0.5);

        channel.play(BATTLE, true, &mut backend);
        assert_eq!(channel.current_clip(), Some(BATTLE));
        assert!(channel.is_looping());

        run(&mut channel, &mut backend, 5.0);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert!(channel.is_playing(&backend));
    }

    #[test]
    fn test_stop_cancels_callback() {
        let mut backend = backend();
        let mut channel = MusicChannel::new(None, &mut backend);
        let count = Arc::new(AtomicUsize::new(0));

        channel.play_then(THEME, Some(counting_callback(&count)), &mut backend);
        run(&mut channel, &mut backend, 0.2);
        channel.stop(&mut backend);

        assert_eq!(channel.current_clip(), None);

        run(&mut channel, &mut backend, 2.0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!channel.is_playing(&backend));
    }

    #[test]
    fn test_missing_callback_still_plays() {
        let mut backend = backend();
        let mut channel = MusicChannel::new(Some(route()), &mut backend);

        channel.play_then(THEME, None, &mut backend);
        assert!(channel.is_playing(&backend));
        assert!(!channel.is_watching());
        assert_eq!(backend.play_count(channel.voice()), 1);
    }

    #[test]
    fn test_chained_callbacks_share_one_voice() {
        let mut backend = backend();
        let mut channel = MusicChannel::new(Some(route()), &mut backend);
        let count = Arc::new(AtomicUsize::new(0));

        channel.play_then(THEME, Some(counting_callback(&count)), &mut backend);
        run(&mut channel, &mut backend, 1.5);
        channel.play_then(BATTLE, Some(counting_callback(&count)), &mut backend);
        run(&mut channel, &mut backend, 2.5);

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(backend.play_count(channel.voice()), 2);
        assert_eq!(backend.created_count(), 1);
    }
}
