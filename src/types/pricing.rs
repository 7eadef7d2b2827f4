use super::cost::Cost;
use super::ids::ModelId;
use super::tokens::TokenUsage;
use crate::constants::DEFAULT_CONTEXT_WINDOW;
use crate::error::{OcmonError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Per-model rates in USD per one million tokens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    #[serde(deserialize_with = "exact_decimal")]
    pub input: Decimal,
    #[serde(deserialize_with = "exact_decimal")]
    pub output: Decimal,
    #[serde(deserialize_with = "exact_decimal")]
    pub cache_write: Decimal,
    #[serde(deserialize_with = "exact_decimal")]
    pub cache_read: Decimal,
    #[serde(default)]
    pub context_window: Option<u64>,
    #[serde(default, deserialize_with = "optional_exact_decimal")]
    pub session_quota: Option<Decimal>,
}

impl ModelPricing {
    /// Rates per million tokens, without context window or quota
    pub fn per_million(
        input: Decimal,
        output: Decimal,
        cache_write: Decimal,
        cache_read: Decimal,
    ) -> Self {
        Self {
            input,
            output,
            cache_write,
            cache_read,
            context_window: None,
            session_quota: None,
        }
    }

    /// Cost of `tokens` at these rates: `count / 1e6 * rate` per category
    pub fn cost_of(&self, tokens: &TokenUsage) -> Cost {
        let cost = per_million(tokens.input, self.input)
            + per_million(tokens.output, self.output)
            + per_million(tokens.cache_write, self.cache_write)
            + per_million(tokens.cache_read, self.cache_read);
        Cost::new(cost)
    }

    pub fn context_window(&self) -> u64 {
        self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }

    pub fn session_quota(&self) -> Option<Cost> {
        self.session_quota.map(Cost::new)
    }
}

#[inline]
fn per_million(count: u64, rate: Decimal) -> Decimal {
    Decimal::from(count) / ONE_MILLION * rate
}

/// Mapping from model identifier to its rates.
///
/// Lookups are exact; models missing from the table are priced at zero by
/// callers rather than treated as errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingTable {
    models: HashMap<ModelId, ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pricing JSON object (`{"model": {"input": 3.0, ...}}`)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let models: HashMap<ModelId, ModelPricing> =
            serde_json::from_str(json).map_err(|source| OcmonError::JsonParse {
                context: "pricing table".to_string(),
                source,
            })?;
        Ok(Self { models })
    }

    /// Load a pricing JSON file. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "pricing file not found, all costs will be zero"
            );
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| OcmonError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), models = table.len(), "loaded pricing table");
        Ok(table)
    }

    pub fn insert(&mut self, model: impl Into<ModelId>, pricing: ModelPricing) {
        self.models.insert(model.into(), pricing);
    }

    #[inline]
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelId> {
        self.models.keys()
    }
}

impl FromIterator<(ModelId, ModelPricing)> for PricingTable {
    fn from_iter<T: IntoIterator<Item = (ModelId, ModelPricing)>>(iter: T) -> Self {
        Self {
            models: iter.into_iter().collect(),
        }
    }
}

// JSON numbers go through their shortest textual form so that `0.3` becomes
// exactly 0.3 rather than the nearest binary float.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Number(serde_json::Number),
    Text(String),
}

impl RawDecimal {
    fn into_decimal<E: serde::de::Error>(self) -> std::result::Result<Decimal, E> {
        let text = match self {
            RawDecimal::Number(n) => n.to_string(),
            RawDecimal::Text(s) => s,
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| E::custom(format!("invalid decimal '{text}': {e}")))
    }
}

fn exact_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    RawDecimal::deserialize(deserializer)?.into_decimal()
}

fn optional_exact_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawDecimal>::deserialize(deserializer)?
        .map(RawDecimal::into_decimal)
        .transpose()
}
