use super::{DateFilter, Timeframe};
use crate::types::{Cost, ModelId, PricingTable, Session, TokenUsage};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelUsageStats {
    pub model: ModelId,
    pub tokens: TokenUsage,
    pub sessions: usize,
    pub interactions: usize,
    pub cost: Cost,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
}

impl ModelUsageStats {
    fn new(model: ModelId) -> Self {
        Self {
            model,
            tokens: TokenUsage::ZERO,
            sessions: 0,
            interactions: 0,
            cost: Cost::ZERO,
            first_used: None,
            last_used: None,
        }
    }
}

/// Per-model usage, most expensive model first
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBreakdownReport {
    pub timeframe: Timeframe,
    pub filter: DateFilter,
    pub models: Vec<ModelUsageStats>,
}

impl ModelBreakdownReport {
    pub fn total_cost(&self) -> Cost {
        self.models.iter().map(|m| m.cost).sum()
    }

    pub fn total_tokens(&self) -> TokenUsage {
        self.models.iter().map(|m| m.tokens).sum()
    }

    pub fn top_model(&self) -> Option<&ModelUsageStats> {
        self.models.first()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectUsageStats {
    pub project_name: String,
    pub project_path: Option<PathBuf>,
    pub tokens: TokenUsage,
    pub sessions: usize,
    pub interactions: usize,
    pub cost: Cost,
    pub models_used: BTreeSet<ModelId>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProjectUsageStats {
    fn new(project_name: String) -> Self {
        Self {
            project_name,
            project_path: None,
            tokens: TokenUsage::ZERO,
            sessions: 0,
            interactions: 0,
            cost: Cost::ZERO,
            models_used: BTreeSet::new(),
            first_activity: None,
            last_activity: None,
        }
    }

    pub fn avg_cost_per_session(&self) -> Cost {
        if self.sessions == 0 {
            return Cost::ZERO;
        }
        Cost::new(self.cost.value() / rust_decimal::Decimal::from(self.sessions))
    }
}

/// Per-project usage, most expensive project first
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBreakdownReport {
    pub timeframe: Timeframe,
    pub filter: DateFilter,
    pub projects: Vec<ProjectUsageStats>,
}

impl ProjectBreakdownReport {
    pub fn total_cost(&self) -> Cost {
        self.projects.iter().map(|p| p.cost).sum()
    }

    pub fn total_tokens(&self) -> TokenUsage {
        self.projects.iter().map(|p| p.tokens).sum()
    }

    pub fn top_project(&self) -> Option<&ProjectUsageStats> {
        self.projects.first()
    }
}

type Timestamp = Option<DateTime<Utc>>;

fn earliest(current: Timestamp, candidate: Timestamp) -> Timestamp {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest(current: Timestamp, candidate: Timestamp) -> Timestamp {
    current.max(candidate)
}

pub fn model_breakdown<'a, Tz: TimeZone>(
    sessions: impl IntoIterator<Item = &'a Session>,
    pricing: &PricingTable,
    timeframe: Timeframe,
    filter: DateFilter,
    tz: &Tz,
) -> ModelBreakdownReport {
    let mut stats: HashMap<ModelId, ModelUsageStats> = HashMap::new();

    for session in sessions.into_iter().filter(|s| filter.accepts(s, tz)) {
        let (start, end) = (session.start_time(), session.end_time());
        for (model, breakdown) in session.model_breakdown(pricing) {
            let entry = stats
                .entry(model.clone())
                .or_insert_with(|| ModelUsageStats::new(model));
            entry.tokens += breakdown.tokens;
            entry.interactions += breakdown.interactions;
            entry.cost += breakdown.cost;
            entry.sessions += 1;
            entry.first_used = earliest(entry.first_used, start);
            entry.last_used = latest(entry.last_used, end);
        }
    }

    let mut models: Vec<ModelUsageStats> = stats.into_values().collect();
    models.sort_by(|a, b| b.cost.cmp(&a.cost).then_with(|| a.model.cmp(&b.model)));

    ModelBreakdownReport {
        timeframe,
        filter,
        models,
    }
}

pub fn project_breakdown<'a, Tz: TimeZone>(
    sessions: impl IntoIterator<Item = &'a Session>,
    pricing: &PricingTable,
    timeframe: Timeframe,
    filter: DateFilter,
    tz: &Tz,
) -> ProjectBreakdownReport {
    let mut stats: HashMap<String, ProjectUsageStats> = HashMap::new();

    for session in sessions.into_iter().filter(|s| filter.accepts(s, tz)) {
        let name = session.project_name();
        let entry = stats
            .entry(name.clone())
            .or_insert_with(|| ProjectUsageStats::new(name));

        if entry.project_path.is_none() {
            entry.project_path = session
                .interactions()
                .find_map(|i| i.project_path())
                .map(PathBuf::from);
        }
        entry.tokens += session.total_tokens();
        entry.interactions += session.interaction_count();
        entry.cost += session.total_cost(pricing);
        entry.sessions += 1;
        entry
            .models_used
            .extend(session.models_used().into_iter().cloned());
        entry.first_activity = earliest(entry.first_activity, session.start_time());
        entry.last_activity = latest(entry.last_activity, session.end_time());
    }

    let mut projects: Vec<ProjectUsageStats> = stats.into_values().collect();
    projects.sort_by(|a, b| {
        b.cost
            .cmp(&a.cost)
            .then_with(|| a.project_name.cmp(&b.project_name))
    });

    ProjectBreakdownReport {
        timeframe,
        filter,
        projects,
    }
}
