use super::DateFilter;
use crate::types::{Cost, ModelId, PricingTable, Session, TokenUsage};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;

/// Totals across a set of sessions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionsSummary {
    pub total_sessions: usize,
    pub total_interactions: usize,
    pub total_tokens: TokenUsage,
    pub total_cost: Cost,
    pub models_used: BTreeSet<ModelId>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl SessionsSummary {
    /// "No sessions", a single date, or "start to end" in `tz`
    pub fn date_range_label<Tz: TimeZone>(&self, tz: &Tz) -> String {
        if self.total_sessions == 0 {
            return "No sessions".to_string();
        }
        match (self.earliest, self.latest) {
            (Some(first), Some(last)) => {
                let first = first.with_timezone(tz).date_naive();
                let last = last.with_timezone(tz).date_naive();
                if first == last {
                    first.to_string()
                } else {
                    format!("{first} to {last}")
                }
            }
            _ => "Unknown".to_string(),
        }
    }
}

pub fn summarize<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    pricing: &PricingTable,
) -> SessionsSummary {
    sessions
        .into_iter()
        .fold(SessionsSummary::default(), |mut summary, session| {
            summary.total_sessions += 1;
            summary.total_interactions += session.interaction_count();
            summary.total_tokens += session.total_tokens();
            summary.total_cost += session.total_cost(pricing);
            summary
                .models_used
                .extend(session.models_used().into_iter().cloned());
            if let Some(start) = session.start_time() {
                summary.earliest = Some(summary.earliest.map_or(start, |e| e.min(start)));
                summary.latest = summary.latest.max(Some(start));
            }
            summary
        })
}

/// Sessions whose start date (in `tz`) passes `filter`, in input order
pub fn filter_sessions_by_date<'a, Tz: TimeZone>(
    sessions: impl IntoIterator<Item = &'a Session>,
    filter: DateFilter,
    tz: &Tz,
) -> Vec<&'a Session> {
    sessions
        .into_iter()
        .filter(|s| filter.accepts(s, tz))
        .collect()
}

/// Sessions that used at least one of `models`
pub fn filter_sessions_by_model<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    models: &[ModelId],
) -> Vec<&'a Session> {
    sessions
        .into_iter()
        .filter(|s| s.interactions().any(|i| models.contains(i.model_id())))
        .collect()
}
