//! Parameter Fade Scheduler
//!
//! Timed interpolation of exposed mixer parameters.
//!
//! ## Slot rules
//!
//! - At most one live fade per parameter.
//! - A new request on a busy parameter either replaces the running fade
//!   (`abort_existing`) or is rejected.
//! - Replaced and stopped fades never invoke their completion callback.
//!
//! ## Task lifecycle
//!
//! ```text
//! start_fade ──▶ AwaitingDelay ──(delay elapsed)──▶ Running ──(progress ≥ 1)──▶ Completed
//!                      │                               │
//!                      └──────── stop / replace ───────┴──────────────────────▶ Cancelled
//! ```
//!
//! The start value is sampled once when the request is accepted. While
//! awaiting the delay nothing is written. Every tick while running writes
//! the eased value; the tick progress reaches 1 writes the exact target.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::backend::{MixerBackend, ParameterId};
use crate::curve::Easing;
use crate::error::FadeError;
use crate::registry::{ExposedParameter, ParameterRegistry, write_parameter};
use crate::watch::CompletionCallback;

// ═══════════════════════════════════════════════════════════════════════════════
// FADE REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of a fade
///
/// ```rust
/// use rf_audio_manager::{FadeRequest, FadeCurve};
/// use std::time::Duration;
///
/// let request = FadeRequest::new("MusicVolume", -80.0)
///     .with_duration(Duration::from_secs(2))
///     .with_delay(Duration::from_millis(500))
///     .with_easing(FadeCurve::Sine)
///     .abort_existing(true);
/// ```
pub struct FadeRequest {
    pub parameter: ParameterId,
    pub target: f32,
    pub duration: Duration,
    pub delay: Duration,
    /// Replace a running fade instead of being rejected
    pub abort_existing: bool,
    pub easing: Easing,
    pub on_complete: Option<CompletionCallback>,
}

impl FadeRequest {
    pub fn new(parameter: impl Into<ParameterId>, target: f32) -> Self {
        Self {
            parameter: parameter.into(),
            target,
            duration: Duration::ZERO,
            delay: Duration::ZERO,
            abort_existing: false,
            easing: Easing::Linear,
            on_complete: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Duration in seconds (negative values clamp to zero)
    pub fn with_duration_secs(self, secs: f32) -> Self {
        self.with_duration(secs_to_duration(secs))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_delay_secs(self, secs: f32) -> Self {
        self.with_delay(secs_to_duration(secs))
    }

    pub fn abort_existing(mut self, abort: bool) -> Self {
        self.abort_existing = abort;
        self
    }

    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = easing.into();
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for FadeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FadeRequest")
            .field("parameter", &self.parameter)
            .field("target", &self.target)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("abort_existing", &self.abort_existing)
            .field("easing", &self.easing)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

fn secs_to_duration(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FADE TASK
// ═══════════════════════════════════════════════════════════════════════════════

/// Fade task state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeState {
    /// Waiting for the pre-delay to elapse
    AwaitingDelay { until: Duration },
    /// Interpolating
    Running { started_at: Duration },
    Completed,
    Cancelled,
}

impl FadeState {
    /// Still occupies its parameter slot
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, FadeState::AwaitingDelay { .. } | FadeState::Running { .. })
    }
}

/// Outcome of advancing a task by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeStep {
    Continue,
    Done,
}

/// Live fade on one parameter
pub struct FadeTask {
    param: ExposedParameter,
    start_value: f32,
    target: f32,
    duration: Duration,
    easing: Easing,
    on_complete: Option<CompletionCallback>,
    state: FadeState,
}

impl FadeTask {
    fn new(param: ExposedParameter, start_value: f32, request: FadeRequest, now: Duration) -> Self {
        let state = if request.delay > Duration::ZERO {
            FadeState::AwaitingDelay {
                until: now.saturating_add(request.delay),
            }
        } else {
            FadeState::Running { started_at: now }
        };

        Self {
            param,
            start_value,
            target: request.target,
            duration: request.duration,
            easing: request.easing,
            on_complete: request.on_complete,
            state,
        }
    }

    pub fn parameter(&self) -> &ParameterId {
        &self.param.id
    }

    pub fn start_value(&self) -> f32 {
        self.start_value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    /// Normalized progress at `now` (0 while awaiting the delay)
    pub fn progress(&self, now: Duration) -> f32 {
        match self.state {
            FadeState::AwaitingDelay { .. } => 0.0,
            FadeState::Running { started_at } => {
                if self.duration.is_zero() {
                    return 1.0;
                }
                let elapsed = now.saturating_sub(started_at).as_secs_f64();
                (elapsed / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
            }
            FadeState::Completed => 1.0,
            FadeState::Cancelled => 0.0,
        }
    }

    fn advance<M: MixerBackend + ?Sized>(&mut self, now: Duration, mixer: &mut M) -> FadeStep {
        if let FadeState::AwaitingDelay { until } = self.state {
            if now < until {
                return FadeStep::Continue;
            }
            self.state = FadeState::Running { started_at: now };
        }

        let progress = self.progress(now);
        let (value, step) = if progress >= 1.0 {
            (self.target, FadeStep::Done)
        } else {
            let value = self.easing.value_at(self.start_value, self.target, progress);
            (value, FadeStep::Continue)
        };

        if let Err(e) = write_parameter(&self.param, value, mixer) {
            log::debug!("Fade write failed: {}", e);
        }

        step
    }

    /// Mark cancelled and drop the callback without calling it
    fn cancel(&mut self) {
        self.state = FadeState::Cancelled;
        self.on_complete = None;
    }
}

impl fmt::Debug for FadeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FadeTask")
            .field("parameter", &self.param.id)
            .field("start_value", &self.start_value)
            .field("target", &self.target)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("state", &self.state)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

/// One fade slot per exposed parameter
#[derive(Debug, Default)]
pub struct ParameterFadeScheduler {
    tasks: HashMap<ParameterId, FadeTask>,
}

impl ParameterFadeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept or reject a fade request
    ///
    /// On acceptance a running fade on the same parameter is cancelled first
    /// (its callback never fires). A failed initial read rejects the request
    /// and leaves any running fade untouched.
    pub fn start_fade<M: MixerBackend + ?Sized>(
        &mut self,
        request: FadeRequest,
        now: Duration,
        registry: &ParameterRegistry,
        mixer: &M,
    ) -> Result<(), FadeError> {
        let param = match registry.resolve(&request.parameter) {
            Some(param) => param.clone(),
            None => {
                log::error!("Can't fade unknown parameter {}", request.parameter);
                return Err(FadeError::UnknownParameter(request.parameter));
            }
        };

        if self.is_fading(&param.id) && !request.abort_existing {
            log::debug!("Fade on {} ignored: already fading", param.id);
            return Err(FadeError::Busy(param.id));
        }

        let start_value = match mixer.get_parameter(&param.mixer, &param.key) {
            Some(value) => value,
            None => {
                log::warn!("Can't read {} from mixer {}, fade aborted", param.key, param.mixer);
                return Err(FadeError::ReadFailed(param.id));
            }
        };

        if let Some(mut previous) = self.tasks.remove(&param.id) {
            log::debug!("Fade on {} replaced", param.id);
            previous.cancel();
        }

        log::debug!(
            "Fade {}: {} -> {} over {:?} (delay {:?}, {})",
            param.id,
            start_value,
            request.target,
            request.duration,
            request.delay,
            request.easing.name()
        );

        let id = param.id.clone();
        self.tasks.insert(id, FadeTask::new(param, start_value, request, now));
        Ok(())
    }

    /// Cancel the fade on `parameter` without invoking its callback
    ///
    /// Returns `true` if a fade was running.
    pub fn stop(&mut self, parameter: &ParameterId) -> bool {
        match self.tasks.remove(parameter) {
            Some(mut task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every fade
    pub fn stop_all(&mut self) -> usize {
        let count = self.tasks.len();
        for (_, mut task) in self.tasks.drain() {
            task.cancel();
        }
        count
    }

    /// Advance every fade by one tick
    ///
    /// Completed fades vacate their slot before their callbacks run. Returns
    /// the number of fades that completed.
    pub fn tick<M: MixerBackend + ?Sized>(&mut self, now: Duration, mixer: &mut M) -> usize {
        let finished: Vec<ParameterId> = self
            .tasks
            .iter_mut()
            .filter_map(|(id, task)| match task.advance(now, &mut *mixer) {
                FadeStep::Done => Some(id.clone()),
                FadeStep::Continue => None,
            })
            .collect();

        let mut callbacks = Vec::new();
        for id in &finished {
            if let Some(mut task) = self.tasks.remove(id) {
                task.state = FadeState::Completed;
                if let Some(callback) = task.on_complete.take() {
                    callbacks.push(callback);
                }
            }
        }

        for callback in callbacks {
            callback();
        }

        finished.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn is_fading(&self, parameter: &ParameterId) -> bool {
        self.tasks
            .get(parameter)
            .is_some_and(|task| task.state.is_live())
    }

    pub fn task(&self, parameter: &ParameterId) -> Option<&FadeTask> {
        self.tasks.get(parameter)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
