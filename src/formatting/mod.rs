use chrono::{DateTime, TimeZone, Utc};

// Format number with thousands separator
pub fn format_number_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let mut count = 0;

    for c in s.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }

    result.chars().rev().collect()
}

/// Format a duration in milliseconds as `ms`, `s`, `m` or `h`.
///
/// Absent and negative durations render as `N/A`.
pub fn format_duration(milliseconds: Option<i64>) -> String {
    let Some(ms) = milliseconds.filter(|ms| *ms >= 0) else {
        return "N/A".to_string();
    };

    if ms < 1000 {
        return format!("{}ms", ms);
    }

    let seconds = ms as f64 / 1000.0;
    if seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.2}m", seconds / 60.0)
    } else {
        format!("{:.2}h", seconds / 3600.0)
    }
}

/// Epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in `tz`
pub fn format_timestamp_in<Tz: TimeZone>(timestamp_ms: Option<i64>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(ms) = timestamp_ms else {
        return "N/A".to_string();
    };

    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Invalid".to_string(),
    }
}

// Format `value / total` as a percentage
pub fn format_percentage(value: f64, total: f64, decimal_places: usize) -> String {
    if total == 0.0 {
        return "0.0%".to_string();
    }
    format!("{:.*}%", decimal_places, value / total * 100.0)
}

/// Text bar of `width` cells filled to `percentage`, e.g. `[███░░] 60.0%`
pub fn format_progress_bar(percentage: f64, width: usize) -> String {
    let clamped = percentage.clamp(0.0, 100.0);
    let filled = ((width as f64) * clamped / 100.0) as usize;
    format!(
        "[{}{}] {:.1}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        percentage
    )
}

/// Human-readable distance between `then` and `now`
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds();

    fn plural(n: i64, unit: &str) -> String {
        format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
    }

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        plural(seconds / 60, "minute")
    } else if seconds < 86_400 {
        plural(seconds / 3600, "hour")
    } else {
        let days = seconds / 86_400;
        if days < 7 {
            plural(days, "day")
        } else if days < 30 {
            plural(days / 7, "week")
        } else {
            plural(days / 30, "month")
        }
    }
}
