//! Structured logging setup.
//!
//! Events go to stderr so the status line on stdout stays clean. The filter
//! comes from `OCMON_LOG` when set, otherwise from the configured level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "OCMON_LOG";

const FALLBACK_LEVEL: &str = "warn";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(default_level: &str) {
    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), default_level);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Pick the first directive string that parses: env value, configured
/// level, then `warn`
fn build_filter(env_value: Option<&str>, default_level: &str) -> EnvFilter {
    env_value
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_LEVEL))
}
