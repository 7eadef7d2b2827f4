//! Live monitoring of the most recent session.
//!
//! One writer calls [`LiveMonitor::refresh`] on a timer; any number of readers
//! call [`LiveMonitor::snapshot`], which works on a published `Arc<Session>`
//! and never observes a half-applied refresh.

use crate::error::Result;
use crate::formatting::format_progress_bar;
use crate::types::{
    BurnRate, ContextUsage, Cost, Interaction, PricingTable, Session, SharedSession, TokenUsage,
};
use crate::utils::SessionLoader;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Where the monitor gets sessions from
#[cfg_attr(test, mockall::automock)]
pub trait SessionSource: Send + Sync {
    fn most_recent_session(&self) -> Result<Option<Session>>;
}

impl SessionSource for SessionLoader {
    fn most_recent_session(&self) -> Result<Option<Session>> {
        SessionLoader::most_recent_session(self)
    }
}

/// What a refresh did to the published session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing to load; the previous session (if any) stays published
    NoSession,
    Unchanged,
    /// Same session, new or changed interactions
    Updated,
    /// A different session became the most recent one
    Switched,
}

/// Time since the last interaction, bucketed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Active,
    Recent,
    Idle,
    Inactive,
    Unknown,
}

impl ActivityStatus {
    pub fn from_elapsed_secs(seconds: Option<i64>) -> Self {
        match seconds {
            None => ActivityStatus::Unknown,
            Some(s) if s < 60 => ActivityStatus::Active,
            Some(s) if s < 300 => ActivityStatus::Recent,
            Some(s) if s < 1800 => ActivityStatus::Idle,
            Some(_) => ActivityStatus::Inactive,
        }
    }

    pub fn to_colored_string(&self) -> ColoredString {
        let label = self.to_string();
        match self {
            ActivityStatus::Active => label.green(),
            ActivityStatus::Recent => label.cyan(),
            ActivityStatus::Idle => label.yellow(),
            ActivityStatus::Inactive | ActivityStatus::Unknown => label.dimmed(),
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Recent => "recent",
            ActivityStatus::Idle => "idle",
            ActivityStatus::Inactive => "inactive",
            ActivityStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Session spend against a per-session quota
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaUsage {
    cost: Cost,
    quota: Cost,
}

impl QuotaUsage {
    /// `None` unless `quota` is positive
    pub fn new(cost: Cost, quota: Cost) -> Option<Self> {
        cost.percentage_of(quota)?;
        Some(Self { cost, quota })
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn quota(&self) -> Cost {
        self.quota
    }

    /// Percentage of the quota spent, capped at 100
    pub fn percentage(&self) -> f64 {
        self.cost
            .percentage_of(self.quota)
            .and_then(|p| p.to_f64())
            .unwrap_or(0.0)
    }

    pub fn to_colored_string(&self) -> ColoredString {
        let percentage = self.percentage();
        let text = format!("{} / {}", self.cost, self.quota);
        if percentage >= 90.0 {
            text.red()
        } else if percentage >= 75.0 {
            text.yellow()
        } else if percentage >= 50.0 {
            text.magenta()
        } else {
            text.green()
        }
    }

    pub fn progress_bar(&self, width: usize) -> String {
        format_progress_bar(self.percentage(), width)
    }
}

/// Everything the live display needs, computed from one session snapshot
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub session: Arc<Session>,
    pub total_tokens: TokenUsage,
    pub total_cost: Cost,
    pub recent_interaction: Option<Interaction>,
    pub burn_rate: Option<BurnRate>,
    pub context: Option<ContextUsage>,
    pub quota: Option<QuotaUsage>,
    pub last_activity_secs: Option<i64>,
    pub activity: ActivityStatus,
}

impl MonitorSnapshot {
    pub fn build(session: Arc<Session>, pricing: &PricingTable, now: DateTime<Utc>) -> Self {
        let total_tokens = session.total_tokens();
        let total_cost = session.total_cost(pricing);
        let recent_interaction = session.most_recent_interaction().cloned();

        let context = recent_interaction
            .as_ref()
            .map(|i| ContextUsage::from_interaction(i, pricing));

        let quota = recent_interaction
            .as_ref()
            .and_then(|i| pricing.get(i.model_id().as_str()))
            .and_then(|p| p.session_quota())
            .and_then(|q| QuotaUsage::new(total_cost, q));

        let last_activity_secs = recent_interaction
            .as_ref()
            .and_then(Interaction::modified_at)
            .map(|t| now.signed_duration_since(t).num_seconds());

        Self {
            burn_rate: BurnRate::from_session(&session, now),
            total_tokens,
            total_cost,
            recent_interaction,
            context,
            quota,
            last_activity_secs,
            activity: ActivityStatus::from_elapsed_secs(last_activity_secs),
            session,
        }
    }
}

pub struct LiveMonitor<S> {
    source: S,
    shared: SharedSession,
}

impl<S: SessionSource> LiveMonitor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            shared: SharedSession::default(),
        }
    }

    pub fn shared(&self) -> &SharedSession {
        &self.shared
    }

    /// Reload the most recent session and publish it if it changed
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(latest) = self.source.most_recent_session()? else {
            debug!("No session to monitor");
            return Ok(RefreshOutcome::NoSession);
        };

        let outcome = match self.shared.snapshot()? {
            Some(current) if *current == latest => return Ok(RefreshOutcome::Unchanged),
            Some(current) if current.session_id() == latest.session_id() => {
                RefreshOutcome::Updated
            }
            _ => RefreshOutcome::Switched,
        };

        debug!(
            session_id = %latest.session_id(),
            interactions = latest.interaction_count(),
            ?outcome,
            "Publishing session"
        );
        self.shared.publish(latest)?;
        Ok(outcome)
    }

    pub fn snapshot(
        &self,
        pricing: &PricingTable,
        now: DateTime<Utc>,
    ) -> Result<Option<MonitorSnapshot>> {
        Ok(self
            .shared
            .snapshot()?
            .map(|session| MonitorSnapshot::build(session, pricing, now)))
    }
}
