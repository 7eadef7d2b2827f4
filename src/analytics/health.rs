use crate::constants::{HIGH_SESSION_COST, LONG_INTERACTION_MS};
use crate::types::{Cost, ModelId, PricingTable, Session};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum HealthWarning {
    /// Interactions that recorded no tokens at all
    EmptyInteractions(usize),
    MissingTimeData(usize),
    /// Named models the pricing table has no rates for
    UnpricedModels(Vec<ModelId>),
    HighCost(Cost),
    /// File names of interactions that ran longer than five minutes
    LongInteractions(Vec<String>),
}

impl fmt::Display for HealthWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthWarning::EmptyInteractions(n) => {
                write!(f, "{n} interactions have no token usage")
            }
            HealthWarning::MissingTimeData(n) => write!(f, "{n} interactions missing time data"),
            HealthWarning::UnpricedModels(models) => {
                let names: Vec<&str> = models.iter().map(ModelId::as_str).collect();
                write!(f, "Unknown models with no pricing: {}", names.join(", "))
            }
            HealthWarning::HighCost(cost) => write!(f, "High session cost: {cost}"),
            HealthWarning::LongInteractions(files) => {
                write!(f, "Long interactions (>5min): {} files", files.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionHealth {
    pub warnings: Vec<HealthWarning>,
    pub total_interactions: usize,
    pub total_cost: Cost,
}

impl SessionHealth {
    pub fn is_healthy(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn check_session_health(session: &Session, pricing: &PricingTable) -> SessionHealth {
    let mut warnings = Vec::new();

    let empty = session
        .interactions()
        .filter(|i| i.tokens().is_zero())
        .count();
    if empty > 0 {
        warnings.push(HealthWarning::EmptyInteractions(empty));
    }

    let missing_time = session
        .interactions()
        .filter(|i| i.time_span().is_none())
        .count();
    if missing_time > 0 {
        warnings.push(HealthWarning::MissingTimeData(missing_time));
    }

    let unpriced: Vec<ModelId> = session
        .models_used()
        .into_iter()
        .filter(|m| !m.is_unknown() && !pricing.contains(m.as_str()))
        .cloned()
        .collect();
    if !unpriced.is_empty() {
        warnings.push(HealthWarning::UnpricedModels(unpriced));
    }

    let total_cost = session.total_cost(pricing);
    if total_cost.value() > HIGH_SESSION_COST {
        warnings.push(HealthWarning::HighCost(total_cost));
    }

    let long: Vec<String> = session
        .interactions()
        .filter(|i| i.duration_ms().is_some_and(|ms| ms > LONG_INTERACTION_MS))
        .map(|i| i.file_name().to_string())
        .collect();
    if !long.is_empty() {
        warnings.push(HealthWarning::LongInteractions(long));
    }

    SessionHealth {
        warnings,
        total_interactions: session.interaction_count(),
        total_cost,
    }
}
