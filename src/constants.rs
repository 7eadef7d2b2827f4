use rust_decimal::Decimal;

/// Model identifier used when an interaction record does not name one
pub const UNKNOWN_MODEL: &str = "unknown";

/// Prefix of session directory names inside the messages directory
pub const SESSION_DIR_PREFIX: &str = "ses_";

/// Context window assumed when the pricing table does not provide one
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

/// Interactions slower than this are reported by the health check
pub const LONG_INTERACTION_MS: i64 = 300_000;

/// Session cost in USD above which the health check raises a warning
pub const HIGH_SESSION_COST: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Project name used when no interaction carries a project path
pub const UNKNOWN_PROJECT: &str = "Unknown";
