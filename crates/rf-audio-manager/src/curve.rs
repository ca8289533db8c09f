//! Fade Curves and Easing
//!
//! Shaping functions applied to normalized fade progress before the value
//! is interpolated between start and target.

use serde::{Deserialize, Serialize};
use std::f32::consts::{E, FRAC_PI_2};
use std::fmt;

/// Preset fade curve shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FadeCurve {
    /// Linear interpolation (constant rate)
    #[default]
    Linear = 0,
    /// Logarithmic curve - 3dB
    Log3 = 1,
    /// Sine quarter period
    Sine = 2,
    /// Logarithmic curve - 1dB
    Log1 = 3,
    /// Inverse S-curve (fast start/end, slow middle)
    InvSCurve = 4,
    /// S-curve (slow start/end, fast middle)
    SCurve = 5,
    /// Exponential curve - 1dB
    Exp1 = 6,
    /// Exponential curve - 3dB
    Exp3 = 7,
}

impl FadeCurve {
    pub const ALL: [FadeCurve; 8] = [
        FadeCurve::Linear,
        FadeCurve::Log3,
        FadeCurve::Sine,
        FadeCurve::Log1,
        FadeCurve::InvSCurve,
        FadeCurve::SCurve,
        FadeCurve::Exp1,
        FadeCurve::Exp3,
    ];

    /// Evaluate curve at progress t (0.0 - 1.0)
    ///
    /// Returns value in range 0.0 - 1.0, monotonic in t.
    #[inline]
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            // y = ln(1 + 3t) / ln(4)
            FadeCurve::Log3 => (1.0 + t * 3.0).ln() / 4.0_f32.ln(),
            // y = sin(t * π/2)
            FadeCurve::Sine => (t * FRAC_PI_2).sin(),
            // y = ln(1 + t) / ln(2)
            FadeCurve::Log1 => (1.0 + t).ln() / 2.0_f32.ln(),
            FadeCurve::InvSCurve => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
            FadeCurve::SCurve => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            // y = (e^t - 1) / (e - 1)
            FadeCurve::Exp1 => (E.powf(t) - 1.0) / (E - 1.0),
            // y = (e^3t - 1) / (e^3 - 1)
            FadeCurve::Exp3 => (E.powf(t * 3.0) - 1.0) / (E.powi(3) - 1.0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYFRAME CURVE
// ═══════════════════════════════════════════════════════════════════════════════

/// Single keyframe (progress → shaped progress)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

/// Authored curve made of keyframes with linear segments
///
/// Evaluation clamps to the first/last key outside the keyed range. An
/// empty curve is the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeCurve {
    keys: Vec<CurveKey>,
}

impl KeyframeCurve {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Straight 0→1 ramp
    pub fn linear() -> Self {
        Self::from_keys([(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn from_keys(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut curve = Self::new();
        for (time, value) in keys {
            curve.add_key(time, value);
        }
        curve
    }

    /// Insert a key, keeping keys sorted by time
    pub fn add_key(&mut self, time: f32, value: f32) {
        let idx = self.keys.partition_point(|k| k.time <= time);
        self.keys.insert(idx, CurveKey { time, value });
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return t,
        };

        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (k0, k1) = (pair[0], pair[1]);
            if t >= k0.time && t <= k1.time {
                let span = k1.time - k0.time;
                if span <= f32::EPSILON {
                    return k1.value;
                }
                let local = (t - k0.time) / span;
                return k0.value + local * (k1.value - k0.value);
            }
        }

        last.value
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EASING
// ═══════════════════════════════════════════════════════════════════════════════

/// Caller-supplied `progress → value` function
pub type FadeFormula = Box<dyn FnMut(f32) -> f32 + Send>;

/// How a fade turns progress into a parameter value
#[derive(Default)]
pub enum Easing {
    /// `lerp(start, target, progress)`
    #[default]
    Linear,
    /// `lerp(start, target, curve(progress))`
    Curve(FadeCurve),
    /// `lerp(start, target, keys(progress))`
    Keyframes(KeyframeCurve),
    /// `formula(progress)`, start and target are not used
    Formula(FadeFormula),
}

impl Easing {
    /// Wrap a closure as a formula easing
    pub fn formula(f: impl FnMut(f32) -> f32 + Send + 'static) -> Self {
        Easing::Formula(Box::new(f))
    }

    /// Value at `progress` (already clamped to 0..=1)
    pub fn value_at(&mut self, start: f32, target: f32, progress: f32) -> f32 {
        match self {
            Easing::Linear => lerp(start, target, progress),
            Easing::Curve(curve) => lerp(start, target, curve.evaluate(progress)),
            Easing::Keyframes(keys) => lerp(start, target, keys.evaluate(progress)),
            Easing::Formula(f) => f(progress),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "Linear",
            Easing::Curve(_) => "Curve",
            Easing::Keyframes(_) => "Keyframes",
            Easing::Formula(_) => "Formula",
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("Linear"),
            Easing::Curve(curve) => f.debug_tuple("Curve").field(curve).finish(),
            Easing::Keyframes(keys) => f.debug_tuple("Keyframes").field(keys).finish(),
            Easing::Formula(_) => f.write_str("Formula(..)"),
        }
    }
}

impl From<FadeCurve> for Easing {
    fn from(curve: FadeCurve) -> Self {
        Easing::Curve(curve)
    }
}

impl From<KeyframeCurve> for Easing {
    fn from(keys: KeyframeCurve) -> Self {
        Easing::Keyframes(keys)
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_boundaries() {
        for curve in FadeCurve::ALL {
            assert!((curve.evaluate(0.0) - 0.0).abs() < 0.001, "{:?} at 0.0", curve);
            assert!((curve.evaluate(1.0) - 1.0).abs() < 0.001, "{:?} at 1.0", curve);

            let mid = curve.evaluate(0.5);
            assert!(mid > 0.0 && mid < 1.0, "{:?} at 0.5 = {}", curve, mid);
        }
    }

    #[test]
    fn test_curve_monotonic() {
        for curve in FadeCurve::ALL {
            let mut prev = 0.0;
            for i in 0..=100 {
                let t = i as f32 / 100.0;
                let val = curve.evaluate(t);
                assert!(val >= prev - 0.0001, "{:?}: {} < {} at t={}", curve, val, prev, t);
                prev = val;
            }
        }
    }

    #[test]
    fn test_keyframes_sorted_and_clamped() {
        let curve = KeyframeCurve::from_keys([(1.0, 1.0), (0.0, 0.0), (0.5, 0.8)]);
        let times: Vec<f32> = curve.keys().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);

        assert!((curve.evaluate(0.25) - 0.4).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.9).abs() < 1e-6);
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(2.0), 1.0);
    }

    #[test]
    fn test_empty_keyframes_identity() {
        let curve = KeyframeCurve::new();
        assert_eq!(curve.evaluate(0.3), 0.3);
    }

    #[test]
    fn test_easing_modes() {
        assert_eq!(Easing::Linear.value_at(-80.0, 0.0, 0.5), -40.0);

        let mut shaped = Easing::from(FadeCurve::SCurve);
        let v = shaped.value_at(0.0, 10.0, 0.25);
        assert!((v - 10.0 * FadeCurve::SCurve.evaluate(0.25)).abs() < 1e-5);

        // Formula bypasses start/target entirely
        let mut formula = Easing::formula(|p| p * 100.0 + 1.0);
        assert_eq!(formula.value_at(-80.0, 0.0, 0.5), 51.0);
        assert_eq!(format!("{:?}", formula), "Formula(..)");
    }
}
