//! Clock-style time formatting for transport displays
//!
//! Positions are shown the way a musician reads a stage timer:
//! `M:SS` under an hour, `H:MM:SS` beyond.

/// Seconds in an hour; at or above this the hour field is shown
const HOUR: u64 = 3600;

/// Format a position or duration in seconds as a clock string.
///
/// Fractions are truncated, negative and non-finite input shows as `0:00`.
///
/// # Examples
///
/// ```
/// use gigbook_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(3725.0), "1:02:05");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    if total >= HOUR {
        format!("{}:{:02}:{:02}", total / HOUR, (total % HOUR) / 60, total % 60)
    } else {
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// `position / duration`, or just the position while the duration is unknown
pub fn format_position(current_seconds: f64, duration_seconds: f64) -> String {
    if duration_seconds > 0.0 {
        format!(
            "{} / {}",
            format_clock(current_seconds),
            format_clock(duration_seconds)
        )
    } else {
        format_clock(current_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(format_clock(5.0), "0:05");
        assert_eq!(format_clock(180.0), "3:00");
        assert_eq!(format_clock(599.99), "9:59");
    }

    #[test]
    fn test_hours() {
        assert_eq!(format_clock(3600.0), "1:00:00");
        assert_eq!(format_clock(7322.0), "2:02:02");
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(format_clock(-4.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_position() {
        assert_eq!(format_position(61.0, 180.0), "1:01 / 3:00");
        assert_eq!(format_position(61.0, 0.0), "1:01");
    }
}
