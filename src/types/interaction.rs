use super::cost::Cost;
use super::ids::{ModelId, SessionId};
use super::pricing::PricingTable;
use super::time_span::TimeSpan;
use super::tokens::TokenUsage;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Record fields not otherwise modeled, kept for forward compatibility
pub type Extensions = BTreeMap<String, serde_json::Value>;

// Pure data structure deserialized from an interaction JSON file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionRecord {
    #[serde(rename = "modelID", default)]
    pub model_id: Option<ModelId>,
    #[serde(default)]
    pub tokens: Option<RecordTokens>,
    #[serde(default)]
    pub time: Option<TimeSpan>,
    #[serde(default)]
    pub path: Option<RecordPath>,
    #[serde(flatten)]
    pub extra: Extensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordTokens {
    #[serde(default)]
    pub input: Option<i64>,
    #[serde(default)]
    pub output: Option<i64>,
    #[serde(default)]
    pub cache: Option<RecordCache>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordCache {
    #[serde(default)]
    pub write: Option<i64>,
    #[serde(default)]
    pub read: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPath {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
}

impl RecordTokens {
    fn to_usage(&self) -> Result<TokenUsage> {
        let cache = self.cache.clone().unwrap_or_default();
        TokenUsage::try_new(
            self.input.unwrap_or(0),
            self.output.unwrap_or(0),
            cache.write.unwrap_or(0),
            cache.read.unwrap_or(0),
        )
    }
}

/// One observed request/response exchange.
///
/// Built once from its source record and never modified afterwards; all
/// accessors hand out shared references or copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    session_id: SessionId,
    source: PathBuf,
    model_id: ModelId,
    tokens: TokenUsage,
    time_span: Option<TimeSpan>,
    project_path: Option<PathBuf>,
    modified_at: Option<DateTime<Utc>>,
    extensions: Extensions,
}

impl Interaction {
    pub fn new(
        session_id: impl Into<SessionId>,
        source: impl Into<PathBuf>,
        model_id: impl Into<ModelId>,
        tokens: TokenUsage,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            source: source.into(),
            model_id: model_id.into(),
            tokens,
            time_span: None,
            project_path: None,
            modified_at: None,
            extensions: Extensions::new(),
        }
    }

    /// Build from a parsed record.
    ///
    /// A missing model becomes `"unknown"` and missing token counts become
    /// zero; negative counts fail with a validation error.
    pub fn from_record(
        record: InteractionRecord,
        session_id: impl Into<SessionId>,
        source: impl Into<PathBuf>,
    ) -> Result<Self> {
        let tokens = match &record.tokens {
            Some(tokens) => tokens.to_usage()?,
            None => TokenUsage::ZERO,
        };

        let project_path = record
            .path
            .and_then(|p| p.cwd.filter(|s| !s.is_empty()).or(p.root))
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            session_id: session_id.into(),
            source: source.into(),
            model_id: record.model_id.unwrap_or_default(),
            tokens,
            time_span: record.time,
            project_path,
            modified_at: None,
            extensions: record.extra,
        })
    }

    pub fn with_time_span(mut self, time_span: TimeSpan) -> Self {
        self.time_span = Some(time_span);
        self
    }

    pub fn with_project_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_path = Some(path.into());
        self
    }

    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Where the record came from; for display only
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn file_name(&self) -> &str {
        self.source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    pub fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    pub fn tokens(&self) -> TokenUsage {
        self.tokens
    }

    pub fn time_span(&self) -> Option<&TimeSpan> {
        self.time_span.as_ref()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.time_span.as_ref().and_then(TimeSpan::duration_ms)
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Cost of this interaction under `pricing`.
    ///
    /// Models missing from the table cost exactly zero.
    pub fn cost(&self, pricing: &PricingTable) -> Cost {
        match pricing.get(self.model_id.as_str()) {
            Some(rates) => rates.cost_of(&self.tokens),
            None => Cost::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcmonError;
    use crate::types::ModelPricing;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sonnet_table() -> PricingTable {
        let mut table = PricingTable::new();
        table.insert(
            "claude-sonnet-4",
            ModelPricing::per_million(d("3"), d("15"), d("3.75"), d("0.3")),
        );
        table
    }

    #[test]
    fn test_from_record_full() {
        let json = r#"{
            "id": "msg_01",
            "role": "assistant",
            "modelID": "claude-sonnet-4",
            "tokens": {
                "input": 1200,
                "output": 300,
                "reasoning": 0,
                "cache": {"write": 50, "read": 4000}
            },
            "time": {"created": 1000, "completed": 2500},
            "path": {"cwd": "/home/dev/projects/ocmon", "root": "/home/dev/projects"}
        }"#;

        let record: InteractionRecord = serde_json::from_str(json).unwrap();
        let interaction =
            Interaction::from_record(record, "ses_1", "/data/ses_1/msg_01.json").unwrap();

        assert_eq!(interaction.model_id().as_str(), "claude-sonnet-4");
        assert_eq!(interaction.tokens(), TokenUsage::new(1200, 300, 50, 4000));
        assert_eq!(interaction.duration_ms(), Some(1500));
        assert_eq!(
            interaction.project_path(),
            Some(Path::new("/home/dev/projects/ocmon"))
        );
        assert_eq!(interaction.file_name(), "msg_01.json");
        assert_eq!(interaction.session_id().as_str(), "ses_1");

        // Unmodeled fields survive; modeled ones are not duplicated
        assert_eq!(interaction.extensions()["role"], "assistant");
        assert!(interaction.extensions().contains_key("id"));
        assert!(!interaction.extensions().contains_key("tokens"));
    }

    #[test]
    fn test_from_record_defaults() {
        let record: InteractionRecord = serde_json::from_str("{}").unwrap();
        let interaction = Interaction::from_record(record, "ses_1", "a.json").unwrap();

        assert!(interaction.model_id().is_unknown());
        assert_eq!(interaction.tokens(), TokenUsage::ZERO);
        assert!(interaction.time_span().is_none());
        assert_eq!(interaction.duration_ms(), None);
        assert!(interaction.project_path().is_none());
    }

    #[test]
    fn test_project_path_falls_back_to_root() {
        let record: InteractionRecord =
            serde_json::from_str(r#"{"path": {"cwd": "", "root": "/srv/app"}}"#).unwrap();
        let interaction = Interaction::from_record(record, "ses_1", "a.json").unwrap();
        assert_eq!(interaction.project_path(), Some(Path::new("/srv/app")));
    }

    #[test]
    fn test_from_record_rejects_negative_tokens() {
        let record: InteractionRecord =
            serde_json::from_str(r#"{"tokens": {"input": -3}}"#).unwrap();
        assert!(matches!(
            Interaction::from_record(record, "ses_1", "a.json"),
            Err(OcmonError::Validation { .. })
        ));
    }

    #[test]
    fn test_cost_uses_model_rates() {
        let interaction = Interaction::new(
            "ses_1",
            "a.json",
            "claude-sonnet-4",
            TokenUsage::new(2_500_000, 0, 0, 0),
        );
        assert_eq!(interaction.cost(&sonnet_table()).value(), d("7.50"));
    }

    #[test]
    fn test_unknown_model_costs_zero() {
        let interaction = Interaction::new(
            "ses_1",
            "a.json",
            "mystery-model",
            TokenUsage::new(9_000_000, 9_000_000, 9_000_000, 9_000_000),
        );
        assert_eq!(interaction.cost(&sonnet_table()), Cost::ZERO);
        assert_eq!(interaction.cost(&PricingTable::new()), Cost::ZERO);
    }

    #[test]
    fn test_cost_is_deterministic() {
        let interaction = Interaction::new(
            "ses_1",
            "a.json",
            "claude-sonnet-4",
            TokenUsage::new(1234, 567, 89, 10),
        );
        let table = sonnet_table();
        assert_eq!(interaction.cost(&table), interaction.cost(&table));
    }
}
