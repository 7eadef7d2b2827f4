use super::cost::Cost;
use super::ids::{ModelId, SessionId};
use super::interaction::Interaction;
use super::pricing::PricingTable;
use super::tokens::TokenUsage;
use crate::constants::UNKNOWN_PROJECT;
use crate::error::{OcmonError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Usage of one model within a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelBreakdown {
    pub interactions: usize,
    pub tokens: TokenUsage,
    pub cost: Cost,
}

/// Per-session averages on top of the raw totals
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatistics {
    pub interaction_count: usize,
    pub total_tokens: TokenUsage,
    pub total_cost: Cost,
    pub avg_tokens_per_interaction: u64,
    pub avg_cost_per_interaction: Cost,
    pub duration_ms: Option<i64>,
    pub total_processing_time_ms: i64,
    pub avg_processing_time_ms: i64,
}

/// A group of interactions sharing a session identifier.
///
/// Interactions keep encounter order, which need not be chronological. Every
/// aggregate is recomputed from the interaction list on each call.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    session_id: SessionId,
    session_path: PathBuf,
    title: Option<String>,
    interactions: Vec<Arc<Interaction>>,
}

impl Session {
    pub fn new(session_id: impl Into<SessionId>, session_path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            session_path: session_path.into(),
            title: None,
            interactions: Vec::new(),
        }
    }

    pub fn with_interactions(
        mut self,
        interactions: impl IntoIterator<Item = Interaction>,
    ) -> Self {
        self.extend(interactions);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(Arc::new(interaction));
    }

    pub fn extend(&mut self, interactions: impl IntoIterator<Item = Interaction>) {
        self.interactions
            .extend(interactions.into_iter().map(Arc::new));
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn interactions(&self) -> impl ExactSizeIterator<Item = &Interaction> + Clone {
        self.interactions.iter().map(|i| i.as_ref())
    }

    #[inline]
    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Distinct model identifiers, sorted
    pub fn models_used(&self) -> BTreeSet<&ModelId> {
        self.interactions().map(Interaction::model_id).collect()
    }

    pub fn total_tokens(&self) -> TokenUsage {
        self.interactions().map(|i| i.tokens()).sum()
    }

    /// Earliest creation time among interactions that have one
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.interactions()
            .filter_map(|i| i.time_span()?.created_datetime())
            .min()
    }

    /// Latest completion time among interactions that have one
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.interactions()
            .filter_map(|i| i.time_span()?.completed_datetime())
            .max()
    }

    /// Wall-clock span from `start_time` to `end_time`
    pub fn duration_ms(&self) -> Option<i64> {
        let (start, end) = (self.start_time()?, self.end_time()?);
        Some(end.signed_duration_since(start).num_milliseconds())
    }

    /// Sum of each interaction's own duration; overlaps count twice
    pub fn total_processing_time_ms(&self) -> i64 {
        self.interactions().filter_map(Interaction::duration_ms).sum()
    }

    pub fn total_cost(&self, pricing: &PricingTable) -> Cost {
        self.interactions().map(|i| i.cost(pricing)).sum()
    }

    /// Partition interactions by model, with per-model counts, tokens and cost
    pub fn model_breakdown(&self, pricing: &PricingTable) -> BTreeMap<ModelId, ModelBreakdown> {
        let mut breakdown: BTreeMap<ModelId, ModelBreakdown> = BTreeMap::new();

        for interaction in self.interactions() {
            let entry = breakdown.entry(interaction.model_id().clone()).or_default();
            entry.interactions += 1;
            entry.tokens += interaction.tokens();
            entry.cost += interaction.cost(pricing);
        }

        breakdown
    }

    pub fn non_zero_token_interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions().filter(|i| !i.tokens().is_zero())
    }

    /// Last path component of the first interaction's project path
    pub fn project_name(&self) -> String {
        self.interactions()
            .find_map(Interaction::project_path)
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNKNOWN_PROJECT.to_string())
    }

    /// Most recently modified interaction, or the last one encountered when
    /// modification times are unknown
    pub fn most_recent_interaction(&self) -> Option<&Interaction> {
        self.interactions()
            .filter(|i| i.modified_at().is_some())
            .max_by_key(|i| i.modified_at())
            .or_else(|| self.interactions().last())
    }

    pub fn statistics(&self, pricing: &PricingTable) -> SessionStatistics {
        let count = self.interaction_count();
        let total_tokens = self.total_tokens();
        let total_cost = self.total_cost(pricing);
        let total_processing_time_ms = self.total_processing_time_ms();

        let (avg_tokens, avg_cost, avg_processing) = if count > 0 {
            (
                total_tokens.total() / count as u64,
                Cost::new(total_cost.value() / rust_decimal::Decimal::from(count)),
                total_processing_time_ms / count as i64,
            )
        } else {
            (0, Cost::ZERO, 0)
        };

        SessionStatistics {
            interaction_count: count,
            total_tokens,
            total_cost,
            avg_tokens_per_interaction: avg_tokens,
            avg_cost_per_interaction: avg_cost,
            duration_ms: self.duration_ms(),
            total_processing_time_ms,
            avg_processing_time_ms: avg_processing,
        }
    }
}

/// A session shared between one writer and any number of readers.
///
/// Readers take an `Arc<Session>` snapshot and compute aggregates on it; the
/// writer copies on write and publishes the new version under the lock, so a
/// reader never sees a sequence change mid-iteration.
#[derive(Debug, Default)]
pub struct SharedSession {
    current: RwLock<Option<Arc<Session>>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(session))),
        }
    }

    /// The latest published session, if any
    pub fn snapshot(&self) -> Result<Option<Arc<Session>>> {
        let guard = self.current.read().map_err(|_| OcmonError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Replace the published session
    pub fn publish(&self, session: Session) -> Result<()> {
        let mut guard = self.current.write().map_err(|_| OcmonError::LockPoisoned)?;
        *guard = Some(Arc::new(session));
        Ok(())
    }

    /// Append to the published session. Returns `false` if none is published.
    pub fn append(&self, interaction: Interaction) -> Result<bool> {
        let mut guard = self.current.write().map_err(|_| OcmonError::LockPoisoned)?;
        match guard.as_mut() {
            Some(session) => {
                Arc::make_mut(session).push(interaction);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelPricing, TimeSpan};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pricing() -> PricingTable {
        let mut table = PricingTable::new();
        table.insert(
            "sonnet",
            ModelPricing::per_million(d("3"), d("15"), d("3.75"), d("0.3")),
        );
        table.insert(
            "opus",
            ModelPricing::per_million(d("15"), d("75"), d("18.75"), d("1.5")),
        );
        table
    }

    fn interaction(model: &str, tokens: TokenUsage, span: Option<(i64, i64)>) -> Interaction {
        let base = Interaction::new("ses_test", format!("{model}.json"), model, tokens);
        match span {
            Some((created, completed)) => {
                base.with_time_span(TimeSpan::new(Some(created), Some(completed)))
            }
            None => base,
        }
    }

    fn sample_session() -> Session {
        Session::new("ses_test", "/tmp/ses_test").with_interactions([
            interaction("sonnet", TokenUsage::new(1000, 500, 0, 2000), Some((1_000, 4_000))),
            interaction("opus", TokenUsage::new(200, 100, 50, 0), Some((2_000, 9_000))),
            interaction("sonnet", TokenUsage::new(0, 0, 0, 0), None),
            interaction("mystery", TokenUsage::new(10, 10, 10, 10), Some((500, 700))),
        ])
    }

    #[test]
    fn test_empty_session_aggregates() {
        let session = Session::new("ses_empty", "/tmp/ses_empty");
        let table = pricing();

        assert_eq!(session.interaction_count(), 0);
        assert_eq!(session.total_tokens().total(), 0);
        assert_eq!(session.total_cost(&table), Cost::ZERO);
        assert!(session.start_time().is_none());
        assert!(session.end_time().is_none());
        assert!(session.duration_ms().is_none());
        assert_eq!(session.total_processing_time_ms(), 0);
        assert!(session.model_breakdown(&table).is_empty());
        assert!(session.models_used().is_empty());
        assert!(session.most_recent_interaction().is_none());
        assert_eq!(session.project_name(), "Unknown");
    }

    #[test]
    fn test_total_tokens_is_field_wise_sum() {
        let session = sample_session();
        let manual: TokenUsage = session.interactions().map(|i| i.tokens()).sum();
        assert_eq!(session.total_tokens(), manual);
        assert_eq!(session.total_tokens(), TokenUsage::new(1210, 610, 60, 2010));
    }

    #[test]
    fn test_models_used() {
        let session = sample_session();
        let models: Vec<&str> = session.models_used().iter().map(|m| m.as_str()).collect();
        assert_eq!(models, vec!["mystery", "opus", "sonnet"]);
    }

    #[test]
    fn test_time_range_ignores_missing_timing() {
        let session = sample_session();
        assert_eq!(session.start_time().unwrap().timestamp_millis(), 500);
        assert_eq!(session.end_time().unwrap().timestamp_millis(), 9_000);
        assert_eq!(session.duration_ms(), Some(8_500));
        // 3000 + 7000 + 200
        assert_eq!(session.total_processing_time_ms(), 10_200);
    }

    #[test]
    fn test_start_time_with_only_completion_data() {
        let session = Session::new("s", "/tmp/s").with_interactions([Interaction::new(
            "s",
            "a.json",
            "sonnet",
            TokenUsage::new(1, 0, 0, 0),
        )
        .with_time_span(TimeSpan::new(None, Some(5_000)))]);

        assert!(session.start_time().is_none());
        assert!(session.end_time().is_some());
        assert!(session.duration_ms().is_none());
    }

    #[test]
    fn test_total_cost_matches_interaction_costs() {
        let session = sample_session();
        let table = pricing();

        let expected: Cost = session.interactions().map(|i| i.cost(&table)).sum();
        assert_eq!(session.total_cost(&table), expected);
        // sonnet: 0.003 + 0.0075 + 0.0006; opus: 0.003 + 0.0075 + 0.0009375
        assert_eq!(session.total_cost(&table).value(), d("0.0225375"));
        assert_eq!(session.total_cost(&PricingTable::new()), Cost::ZERO);
    }

    #[test]
    fn test_model_breakdown_partitions_interactions() {
        let session = sample_session();
        let table = pricing();
        let breakdown = session.model_breakdown(&table);

        assert_eq!(breakdown.len(), 3);
        let counted: usize = breakdown.values().map(|b| b.interactions).sum();
        assert_eq!(counted, session.interaction_count());

        let cost: Cost = breakdown.values().map(|b| b.cost).sum();
        assert_eq!(cost, session.total_cost(&table));

        let tokens: TokenUsage = breakdown.values().map(|b| b.tokens).sum();
        assert_eq!(tokens, session.total_tokens());

        let sonnet = &breakdown[&ModelId::from("sonnet")];
        assert_eq!(sonnet.interactions, 2);
        assert_eq!(sonnet.tokens, TokenUsage::new(1000, 500, 0, 2000));
        assert_eq!(breakdown[&ModelId::from("mystery")].cost, Cost::ZERO);
    }

    #[test]
    fn test_aggregates_are_order_independent() {
        let session = sample_session();
        let mut reversed: Vec<Interaction> = session.interactions().cloned().collect();
        reversed.reverse();
        reversed.rotate_left(1);
        let permuted = Session::new("ses_test", "/tmp/ses_test").with_interactions(reversed);
        let table = pricing();

        assert_eq!(session.total_tokens(), permuted.total_tokens());
        assert_eq!(session.total_cost(&table), permuted.total_cost(&table));
        assert_eq!(
            session.model_breakdown(&table),
            permuted.model_breakdown(&table)
        );
        assert_eq!(session.interaction_count(), permuted.interaction_count());
        assert_eq!(session.start_time(), permuted.start_time());
        assert_eq!(session.end_time(), permuted.end_time());
    }

    #[test]
    fn test_non_zero_token_interactions() {
        let session = sample_session();
        assert_eq!(session.non_zero_token_interactions().count(), 3);
        assert!(
            session
                .non_zero_token_interactions()
                .all(|i| i.tokens().total() > 0)
        );
    }

    #[test]
    fn test_negative_interaction_duration_is_tolerated() {
        let session = Session::new("s", "/tmp/s").with_interactions([
            interaction("sonnet", TokenUsage::new(1, 0, 0, 0), Some((5_000, 2_000))),
        ]);
        assert_eq!(session.total_processing_time_ms(), -3_000);
        assert_eq!(session.duration_ms(), Some(-3_000));
    }

    #[test]
    fn test_project_name_and_recent_interaction() {
        let early = Utc::now() - chrono::Duration::minutes(5);
        let late = Utc::now();
        let session = Session::new("s", "/tmp/s").with_interactions([
            Interaction::new("s", "new.json", "sonnet", TokenUsage::new(1, 0, 0, 0))
                .with_modified_at(late),
            Interaction::new("s", "old.json", "sonnet", TokenUsage::new(1, 0, 0, 0))
                .with_modified_at(early)
                .with_project_path("/home/dev/ocmon"),
        ]);

        assert_eq!(session.project_name(), "ocmon");
        assert_eq!(session.most_recent_interaction().unwrap().file_name(), "new.json");

        let untimed = sample_session();
        assert_eq!(
            untimed.most_recent_interaction().unwrap().model_id().as_str(),
            "mystery"
        );
    }

    #[test]
    fn test_statistics() {
        let session = sample_session();
        let stats = session.statistics(&pricing());

        assert_eq!(stats.interaction_count, 4);
        assert_eq!(stats.avg_tokens_per_interaction, 3890 / 4);
        assert_eq!(stats.avg_processing_time_ms, 10_200 / 4);
        assert_eq!(stats.avg_cost_per_interaction.value(), d("0.005634375"));

        let empty = Session::new("e", "/tmp/e").statistics(&pricing());
        assert_eq!(empty.avg_cost_per_interaction, Cost::ZERO);
        assert_eq!(empty.avg_tokens_per_interaction, 0);
    }

    #[test]
    fn test_shared_session_snapshots_are_stable() {
        let shared = SharedSession::new(Session::new("s", "/tmp/s"));
        let before = shared.snapshot().unwrap().unwrap();

        assert!(
            shared
                .append(interaction("sonnet", TokenUsage::new(5, 0, 0, 0), None))
                .unwrap()
        );

        let after = shared.snapshot().unwrap().unwrap();
        assert_eq!(before.interaction_count(), 0);
        assert_eq!(after.interaction_count(), 1);
    }

    #[test]
    fn test_shared_session_append_without_session() {
        let shared = SharedSession::default();
        assert!(shared.snapshot().unwrap().is_none());
        assert!(
            !shared
                .append(interaction("sonnet", TokenUsage::new(1, 0, 0, 0), None))
                .unwrap()
        );
    }

    #[test]
    fn test_shared_session_concurrent_reads_see_consistent_state() {
        let shared = SharedSession::new(Session::new("s", "/tmp/s"));
        let per_interaction = TokenUsage::new(3, 2, 1, 4);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..500 {
                    shared
                        .append(interaction("sonnet", per_interaction, None))
                        .unwrap();
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot().unwrap().unwrap();
                        let count = snapshot.interaction_count() as u64;
                        assert_eq!(
                            snapshot.total_tokens().total(),
                            count * per_interaction.total()
                        );
                        let breakdown_count: usize = snapshot
                            .model_breakdown(&PricingTable::new())
                            .values()
                            .map(|b| b.interactions)
                            .sum();
                        assert_eq!(breakdown_count as u64, count);
                    }
                });
            }
        });

        let last = shared.snapshot().unwrap().unwrap();
        assert_eq!(last.interaction_count(), 500);
    }
}
