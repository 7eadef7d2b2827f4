use super::session::Session;
use crate::formatting::format_number_with_commas;
use chrono::{DateTime, Utc};
use colored::ColoredString;
use colored::*;
use std::fmt;

/// Represents the burn rate (tokens per minute) of a session
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BurnRate(f64);

impl BurnRate {
    const HOT: f64 = 10_000.0;
    const WARM: f64 = 5_000.0;

    /// Create from a raw tokens-per-minute value
    pub fn new(tokens_per_minute: f64) -> Self {
        BurnRate(tokens_per_minute)
    }

    /// Total session tokens divided by the minutes elapsed since the session
    /// started, measured at `now`
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Option<Self> {
        let total_tokens = session.total_tokens().total();
        if total_tokens == 0 {
            return None;
        }

        let start = session.start_time()?;
        let elapsed_minutes = now.signed_duration_since(start).num_milliseconds() as f64 / 60_000.0;

        // Skip if duration is 0 or negative
        if elapsed_minutes <= 0.0 {
            return None;
        }

        Some(BurnRate(total_tokens as f64 / elapsed_minutes))
    }

    /// Get the raw value
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Get a colored string representation for terminal output
    pub fn to_colored_string(&self) -> ColoredString {
        let rate_str = self.to_string();
        if self.0 > Self::HOT {
            rate_str.red()
        } else if self.0 > Self::WARM {
            rate_str.yellow()
        } else {
            rate_str.green()
        }
    }
}

impl fmt::Display for BurnRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.max(0.0).round() as u64;
        write!(f, "{} tok/min", format_number_with_commas(rounded))
    }
}
