//! Unit conversions for mixer parameter values

/// Floor used for silence
pub const MIN_DB: f32 = -144.0;

/// Linear gain → dB (silence maps to `MIN_DB`)
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        MIN_DB
    } else {
        (20.0 * linear.log10()).max(MIN_DB)
    }
}

/// dB → linear gain (`MIN_DB` and below map to 0)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db <= MIN_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Linear gain → millibel (1 dB = 100 mB)
#[inline]
pub fn linear_to_millibel(linear: f32) -> f32 {
    linear_to_db(linear) * 100.0
}

#[inline]
pub fn millibel_to_linear(millibel: f32) -> f32 {
    db_to_linear(millibel / 100.0)
}

#[inline]
pub fn secs_to_ms(secs: f32) -> f32 {
    secs * 1000.0
}

#[inline]
pub fn ms_to_secs(ms: f32) -> f32 {
    ms / 1000.0
}

/// Period → frequency (a zero period yields infinity)
#[inline]
pub fn secs_to_hz(secs: f32) -> f32 {
    1.0 / secs
}

/// Frequency → period (a zero frequency yields infinity)
#[inline]
pub fn hz_to_secs(hz: f32) -> f32 {
    1.0 / hz
}
