//! Display helpers for durations.

const PLACEHOLDER: &str = "—";

/// `1m 05s` above a minute, otherwise `12.5s`.
pub fn format_seconds(value: Option<f64>) -> String {
    match value {
        Some(secs) if secs.is_finite() => {
            if secs >= 60.0 {
                let mins = (secs / 60.0).floor() as u64;
                let rem = (secs % 60.0).round() as u64;
                format!("{}m {:02}s", mins, rem)
            } else {
                format!("{:.1}s", secs)
            }
        }
        _ => PLACEHOLDER.to_string(),
    }
}

/// Same as [`format_seconds`] for millisecond values.
pub fn format_ms(value: Option<f64>) -> String {
    format_seconds(value.map(|ms| ms / 1000.0))
}

/// Rounded short form used for segment lists: `45s`, `2m 03s`.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0s".to_string();
    }
    if seconds < 60.0 {
        return format!("{}s", seconds.round() as u64);
    }
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).round() as u64;
    format!("{}m {:02}s", mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Some(12.34)), "12.3s");
        assert_eq!(format_seconds(Some(65.0)), "1m 05s");
        assert_eq!(format_seconds(Some(0.0)), "0.0s");
        assert_eq!(format_seconds(None), "—");
        assert_eq!(format_seconds(Some(f64::NAN)), "—");
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(Some(1500.0)), "1.5s");
        assert_eq!(format_ms(Some(125_000.0)), "2m 05s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(44.6), "45s");
        assert_eq!(format_duration(123.0), "2m 03s");
    }
}
