use crate::error::{PlaybackError, Result};

/// Formats a track offset as `m:ss.mmm`. Negative offsets render as zero.
///
/// # Example
/// ```
/// use playback::format_timestamp;
///
/// assert_eq!(format_timestamp(83_456), "1:23.456");
/// assert_eq!(format_timestamp(4_500_000), "75:00.000");
/// ```
pub fn format_timestamp(t_ms: i64) -> String {
    let t_ms = t_ms.max(0);
    let minutes = t_ms / 60_000;
    let seconds = (t_ms % 60_000) / 1_000;
    let millis = t_ms % 1_000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

/// Parses a track offset.
///
/// Accepts plain milliseconds (`"12500"`), `m:ss`, `m:ss.f` with up to three
/// fraction digits, and `h:mm:ss(.f)`.
///
/// # Example
/// ```
/// use playback::parse_timestamp;
///
/// assert_eq!(parse_timestamp("1:23.4").expect("valid"), 83_400);
/// assert_eq!(parse_timestamp("1:00:00").expect("valid"), 3_600_000);
/// assert_eq!(parse_timestamp("750").expect("valid"), 750);
/// assert!(parse_timestamp("1:75").is_err());
/// ```
pub fn parse_timestamp(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    if !trimmed.contains(':') {
        return parse_digits(trimmed).ok_or_else(|| invalid(input));
    }

    let mut parts = trimmed.rsplitn(3, ':');
    let seconds_part = parts.next().ok_or_else(|| invalid(input))?;
    let minutes = parts
        .next()
        .and_then(parse_digits)
        .ok_or_else(|| invalid(input))?;
    let hours = match parts.next() {
        Some(hours) => Some(parse_digits(hours).ok_or_else(|| invalid(input))?),
        None => None,
    };
    if hours.is_some() && minutes >= 60 {
        return Err(invalid(input));
    }

    let (whole_seconds, fraction) = seconds_part.split_once('.').unwrap_or((seconds_part, ""));
    let seconds = parse_digits(whole_seconds).ok_or_else(|| invalid(input))?;
    if seconds >= 60 {
        return Err(invalid(input));
    }
    let millis = parse_fraction_millis(fraction, seconds_part.contains('.'))
        .ok_or_else(|| invalid(input))?;

    let total_seconds = hours
        .unwrap_or(0)
        .checked_mul(60)
        .and_then(|value| value.checked_add(minutes))
        .and_then(|value| value.checked_mul(60))
        .and_then(|value| value.checked_add(seconds))
        .ok_or_else(|| invalid(input))?;
    total_seconds
        .checked_mul(1_000)
        .and_then(|value| value.checked_add(millis))
        .ok_or_else(|| invalid(input))
}

fn parse_digits(value: &str) -> Option<i64> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse::<i64>().ok()
}

fn parse_fraction_millis(fraction: &str, has_separator: bool) -> Option<i64> {
    if !has_separator {
        return Some(0);
    }
    if fraction.is_empty() || fraction.len() > 3 {
        return None;
    }

    let digits = parse_digits(fraction)?;
    let scale = match fraction.len() {
        1 => 100,
        2 => 10,
        _ => 1,
    };
    Some(digits * scale)
}

fn invalid(input: &str) -> PlaybackError {
    PlaybackError::InvalidTimestamp {
        value: input.to_string(),
    }
}
