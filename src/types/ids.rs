use crate::constants::UNKNOWN_MODEL;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// NewType wrapper for Session ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new SessionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// NewType wrapper for a model identifier such as `claude-sonnet-4-20250514`
/// or a provider-qualified `qwen/qwen3-coder`.
///
/// Defaults to the `"unknown"` sentinel, which is what interaction records
/// without a model resolve to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Create a new ModelId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The `"unknown"` sentinel
    pub fn unknown() -> Self {
        Self(UNKNOWN_MODEL.to_string())
    }

    /// Whether this is the `"unknown"` sentinel
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_MODEL
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets pricing lookups use plain `&str` keys
impl Borrow<str> for ModelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_default_is_unknown() {
        let model = ModelId::default();
        assert!(model.is_unknown());
        assert_eq!(model.as_str(), "unknown");
        assert!(!ModelId::from("claude-sonnet-4").is_unknown());
    }

    #[test]
    fn test_ids_serde_transparent() {
        let model: ModelId = serde_json::from_str("\"qwen/qwen3-coder\"").unwrap();
        assert_eq!(model, ModelId::new("qwen/qwen3-coder"));

        let session = SessionId::from("ses_abc");
        assert_eq!(serde_json::to_string(&session).unwrap(), "\"ses_abc\"");
    }
}
