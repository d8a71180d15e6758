//! Duration formatting for alerts and tables.
//!
//! Durations are rendered at the two most significant units:
//!
//! - 1 hour 5 minutes 12 seconds → `"1h 5m"`
//! - 3 minutes 2 seconds → `"3m 2s"`
//! - 5 seconds → `"5s"`
//!
//! ```rust
//! use timeup::libs::formatter::format_time;
//!
//! assert_eq!(format_time(3912), "1h 5m");
//! ```

/// Formats whole seconds as a short human-readable duration.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Formats a limit in seconds, rendering an unset limit as `-`.
pub fn format_limit(seconds: u64) -> String {
    if seconds == 0 {
        "-".to_string()
    } else {
        format_time(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_picks_two_largest_units() {
        assert_eq!(format_time(0), "0s");
        assert_eq!(format_time(59), "59s");
        assert_eq!(format_time(182), "3m 2s");
        assert_eq!(format_time(3600), "1h 0m");
        assert_eq!(format_time(90_061), "25h 1m");
    }

    #[test]
    fn format_limit_marks_unset() {
        assert_eq!(format_limit(0), "-");
        assert_eq!(format_limit(600), "10m 0s");
    }
}
