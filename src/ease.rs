use crate::core::clamp01;

/// Ease-in power curve used by `Accelerate`: `t^rate` with `rate > 0`.
pub fn accelerate(t: f64, rate: f64) -> f64 {
    clamp01(t).powf(rate)
}

/// Smoothstep ease-in/ease-out used by `AccelDeccel`.
pub fn accel_deccel(t: f64) -> f64 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}
