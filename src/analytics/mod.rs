//! Multi-session reporting: calendar breakdowns, per-model and per-project
//! reports, summaries and health checks.
//!
//! Calendar dates are taken from each session's start time in a
//! caller-supplied timezone, so callers decide between local and UTC days.

pub mod breakdown;
pub mod health;
pub mod summary;
pub mod timeframe;

use crate::types::Session;
use crate::utils::time::{
    DateRange, current_month_range, current_week_range, datetime_in_range,
};
use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use breakdown::{
    ModelBreakdownReport, ModelUsageStats, ProjectBreakdownReport, ProjectUsageStats,
    model_breakdown, project_breakdown,
};
pub use health::{HealthWarning, SessionHealth, check_session_health};
pub use summary::{SessionsSummary, filter_sessions_by_date, filter_sessions_by_model, summarize};
pub use timeframe::{
    DailyUsage, MonthlyUsage, WeeklyUsage, daily_breakdown, monthly_breakdown, weekly_breakdown,
};

/// Granularity a report was requested for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
    All,
}

impl Timeframe {
    /// The period of this granularity that contains `today`; `All` is unbounded
    pub fn current_filter(self, today: NaiveDate) -> DateFilter {
        let range = match self {
            Timeframe::Daily => Some((today, today)),
            Timeframe::Weekly => current_week_range(today),
            Timeframe::Monthly => current_month_range(today),
            Timeframe::All => None,
        };
        range.map(DateFilter::from_range).unwrap_or_default()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::All => "all",
        };
        f.write_str(name)
    }
}

/// Inclusive date bounds applied to session start dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn from_range((start, end): DateRange) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Unbounded filters accept every session; bounded ones only sessions
    /// whose start date falls inside the bounds.
    pub fn accepts<Tz: TimeZone>(&self, session: &Session, tz: &Tz) -> bool {
        if self.is_unbounded() {
            return true;
        }
        session
            .start_time()
            .is_some_and(|start| datetime_in_range(&start.with_timezone(tz), self.start, self.end))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::types::TokenUsage;
    use chrono::Utc;

    #[test]
    fn test_date_filter() {
        let session = session(
            "ses_a",
            "proj",
            millis(2024, 3, 10, 12),
            &[("sonnet", TokenUsage::new(1, 0, 0, 0))],
        );
        let untimed = crate::types::Session::new("ses_b", "/data/ses_b");
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d);

        assert!(DateFilter::default().accepts(&session, &Utc));
        assert!(DateFilter::default().accepts(&untimed, &Utc));
        assert!(DateFilter::new(day(10), day(10)).accepts(&session, &Utc));
        assert!(!DateFilter::new(day(11), None).accepts(&session, &Utc));
        assert!(!DateFilter::new(None, day(9)).accepts(&session, &Utc));
        assert!(!DateFilter::new(day(1), None).accepts(&untimed, &Utc));
    }

    #[test]
    fn test_current_filter() {
        // a Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d);

        assert_eq!(
            Timeframe::Daily.current_filter(today),
            DateFilter::new(Some(today), Some(today))
        );
        assert_eq!(
            Timeframe::Weekly.current_filter(today),
            DateFilter::new(day(2, 26), day(3, 3))
        );
        assert_eq!(
            Timeframe::Monthly.current_filter(today),
            DateFilter::new(day(2, 1), day(2, 29))
        );
        assert!(Timeframe::All.current_filter(today).is_unbounded());
    }

    #[test]
    fn test_timeframe_serde() {
        let tf: Timeframe = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(tf, Timeframe::Weekly);
        assert_eq!(Timeframe::Monthly.to_string(), "monthly");
        assert!(serde_json::from_str::<Timeframe>("\"hourly\"").is_err());
    }
}
