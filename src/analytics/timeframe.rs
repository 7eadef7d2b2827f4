use crate::types::{Cost, ModelId, PricingTable, Session, TokenUsage};
use crate::utils::time::week_range;
use chrono::{Datelike, NaiveDate, TimeZone};
use std::collections::{BTreeMap, BTreeSet};

/// Sessions that started on one calendar day
#[derive(Debug, Clone)]
pub struct DailyUsage<'a> {
    pub date: NaiveDate,
    pub sessions: Vec<&'a Session>,
}

impl<'a> DailyUsage<'a> {
    pub fn total_tokens(&self) -> TokenUsage {
        self.sessions.iter().map(|s| s.total_tokens()).sum()
    }

    pub fn total_interactions(&self) -> usize {
        self.sessions.iter().map(|s| s.interaction_count()).sum()
    }

    pub fn models_used(&self) -> BTreeSet<&'a ModelId> {
        self.sessions
            .iter()
            .copied()
            .flat_map(Session::models_used)
            .collect()
    }

    pub fn total_cost(&self, pricing: &PricingTable) -> Cost {
        self.sessions.iter().map(|s| s.total_cost(pricing)).sum()
    }
}

/// Days belonging to one ISO week
#[derive(Debug, Clone)]
pub struct WeeklyUsage<'a> {
    pub year: i32,
    pub week: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<DailyUsage<'a>>,
}

impl WeeklyUsage<'_> {
    pub fn total_tokens(&self) -> TokenUsage {
        self.days.iter().map(DailyUsage::total_tokens).sum()
    }

    pub fn total_sessions(&self) -> usize {
        self.days.iter().map(|d| d.sessions.len()).sum()
    }

    pub fn total_interactions(&self) -> usize {
        self.days.iter().map(DailyUsage::total_interactions).sum()
    }

    pub fn total_cost(&self, pricing: &PricingTable) -> Cost {
        self.days.iter().map(|d| d.total_cost(pricing)).sum()
    }
}

/// Weeks whose first day falls in one calendar month
#[derive(Debug, Clone)]
pub struct MonthlyUsage<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<WeeklyUsage<'a>>,
}

impl MonthlyUsage<'_> {
    pub fn total_tokens(&self) -> TokenUsage {
        self.weeks.iter().map(WeeklyUsage::total_tokens).sum()
    }

    pub fn total_sessions(&self) -> usize {
        self.weeks.iter().map(WeeklyUsage::total_sessions).sum()
    }

    pub fn total_interactions(&self) -> usize {
        self.weeks.iter().map(WeeklyUsage::total_interactions).sum()
    }

    pub fn total_cost(&self, pricing: &PricingTable) -> Cost {
        self.weeks.iter().map(|w| w.total_cost(pricing)).sum()
    }
}

/// Group sessions by the date (in `tz`) they started, oldest day first.
/// Sessions without a start time are left out.
pub fn daily_breakdown<'a, Tz: TimeZone>(
    sessions: impl IntoIterator<Item = &'a Session>,
    tz: &Tz,
) -> Vec<DailyUsage<'a>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&'a Session>> = BTreeMap::new();

    for session in sessions {
        if let Some(start) = session.start_time() {
            let date = start.with_timezone(tz).date_naive();
            by_date.entry(date).or_default().push(session);
        }
    }

    by_date
        .into_iter()
        .map(|(date, sessions)| DailyUsage { date, sessions })
        .collect()
}

/// Group days by ISO week, oldest first
pub fn weekly_breakdown(daily: Vec<DailyUsage<'_>>) -> Vec<WeeklyUsage<'_>> {
    let mut by_week: BTreeMap<(i32, u32), Vec<DailyUsage<'_>>> = BTreeMap::new();

    for day in daily {
        let iso = day.date.iso_week();
        by_week.entry((iso.year(), iso.week())).or_default().push(day);
    }

    by_week
        .into_iter()
        .filter_map(|((year, week), days)| {
            let (start_date, end_date) = week_range(year, week)?;
            Some(WeeklyUsage {
                year,
                week,
                start_date,
                end_date,
                days,
            })
        })
        .collect()
}

/// Group weeks by the month of their first day, oldest first
pub fn monthly_breakdown(weekly: Vec<WeeklyUsage<'_>>) -> Vec<MonthlyUsage<'_>> {
    let mut by_month: BTreeMap<(i32, u32), Vec<WeeklyUsage<'_>>> = BTreeMap::new();

    for week in weekly {
        let key = (week.start_date.year(), week.start_date.month());
        by_month.entry(key).or_default().push(week);
    }

    by_month
        .into_iter()
        .map(|((year, month), weeks)| MonthlyUsage { year, month, weeks })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::*;
    use chrono::{FixedOffset, Utc};

    fn sessions() -> Vec<Session> {
        vec![
            session(
                "ses_1",
                "a",
                millis(2024, 1, 31, 10),
                &[("sonnet", TokenUsage::new(1_000_000, 0, 0, 0))],
            ),
            session(
                "ses_2",
                "a",
                millis(2024, 1, 31, 22),
                &[("opus", TokenUsage::new(0, 100_000, 0, 0))],
            ),
            session(
                "ses_3",
                "b",
                millis(2024, 2, 5, 9),
                &[
                    ("sonnet", TokenUsage::new(10, 10, 10, 10)),
                    ("opus", TokenUsage::new(5, 5, 5, 5)),
                ],
            ),
            Session::new("ses_untimed", "/data/ses_untimed"),
        ]
    }

    #[test]
    fn test_daily_breakdown() {
        let sessions = sessions();
        let daily = daily_breakdown(&sessions, &Utc);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(daily[0].sessions.len(), 2);
        assert_eq!(daily[0].total_interactions(), 2);
        assert_eq!(daily[0].total_tokens(), TokenUsage::new(1_000_000, 100_000, 0, 0));
        // $3 input + $7.50 output
        assert_eq!(daily[0].total_cost(&pricing()).value(), rust_decimal::Decimal::new(1050, 2));
        assert_eq!(daily[0].models_used().len(), 2);
        assert_eq!(daily[1].total_interactions(), 2);
    }

    #[test]
    fn test_daily_breakdown_respects_timezone() {
        let sessions = sessions();
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        let daily = daily_breakdown(&sessions, &plus_three);

        // 22:00 UTC on Jan 31 is Feb 1 at +03:00
        let dates: Vec<String> = daily.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-31", "2024-02-01", "2024-02-05"]);
    }

    #[test]
    fn test_weekly_and_monthly_breakdown() {
        let sessions = sessions();
        let weekly = weekly_breakdown(daily_breakdown(&sessions, &Utc));

        assert_eq!(weekly.len(), 2);
        assert_eq!((weekly[0].year, weekly[0].week), (2024, 5));
        assert_eq!(weekly[0].start_date, NaiveDate::from_ymd_opt(2024, 1, 29).unwrap());
        assert_eq!(weekly[0].end_date, NaiveDate::from_ymd_opt(2024, 2, 4).unwrap());
        assert_eq!(weekly[0].total_sessions(), 2);
        assert_eq!((weekly[1].year, weekly[1].week), (2024, 6));

        let table = pricing();
        let week_total: Cost = weekly.iter().map(|w| w.total_cost(&table)).sum();
        let session_total: Cost = sessions.iter().map(|s| s.total_cost(&table)).sum();
        assert_eq!(week_total, session_total);

        let monthly = monthly_breakdown(weekly);
        assert_eq!(monthly.len(), 2);
        assert_eq!((monthly[0].year, monthly[0].month), (2024, 1));
        assert_eq!((monthly[1].year, monthly[1].month), (2024, 2));
        assert_eq!(monthly[0].total_sessions(), 2);
        assert_eq!(monthly[1].total_interactions(), 2);
        assert_eq!(
            monthly[0].total_tokens() + monthly[1].total_tokens(),
            sessions.iter().map(|s| s.total_tokens()).sum::<TokenUsage>()
        );
    }

    #[test]
    fn test_empty_breakdowns() {
        let none: Vec<Session> = Vec::new();
        let daily = daily_breakdown(&none, &Utc);
        assert!(daily.is_empty());
        assert!(monthly_breakdown(weekly_breakdown(daily)).is_empty());
    }
}
