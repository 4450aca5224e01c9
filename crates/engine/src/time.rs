pub use playback::{format_timestamp, parse_timestamp};

/// Clamps a track offset to `[0, duration_ms]`, or to `[0, +inf)` while the
/// duration is unknown.
///
/// # Example
/// ```
/// use cue_engine::time::clamp_to_track;
///
/// assert_eq!(clamp_to_track(-20, Some(1_000)), 0);
/// assert_eq!(clamp_to_track(1_500, Some(1_000)), 1_000);
/// assert_eq!(clamp_to_track(1_500, None), 1_500);
/// ```
pub fn clamp_to_track(t_ms: i64, duration_ms: Option<i64>) -> i64 {
    match known_duration(duration_ms) {
        Some(duration) => t_ms.clamp(0, duration),
        None => t_ms.max(0),
    }
}

/// Normalizes a reported duration: non-positive values count as unknown.
pub fn known_duration(duration_ms: Option<i64>) -> Option<i64> {
    duration_ms.filter(|duration| *duration > 0)
}

/// Floors a fractional millisecond value, saturating at the `i64` range.
/// Returns `None` for non-finite input.
pub fn floor_ms(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }

    let floored = value.floor();
    if floored >= i64::MAX as f64 {
        Some(i64::MAX)
    } else if floored <= i64::MIN as f64 {
        Some(i64::MIN)
    } else {
        Some(floored as i64)
    }
}
