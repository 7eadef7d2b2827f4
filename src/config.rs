//! TOML configuration.
//!
//! Every section and field is optional; anything missing takes its default.
//! Lookup order: explicit path, `$OCMON_CONFIG`, `./config.toml`,
//! `./ocmon.toml`, `~/.config/ocmon/config.toml`.

use crate::analytics::Timeframe;
use crate::error::{OcmonError, Result};
use crate::export::{ExportFormat, Exporter};
use crate::types::PricingTable;
use crate::utils::SessionLoader;
use crate::utils::paths::{default_user_config, expand_home, resolve_relative};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "OCMON_CONFIG";
pub const MESSAGES_DIR_ENV: &str = "OCMON_MESSAGES_DIR";

const REFRESH_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 1..=60;
const RECENT_SESSIONS_RANGE: std::ops::RangeInclusive<usize> = 1..=1000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub ui: UiConfig,
    pub models: ModelsConfig,
    pub analytics: AnalyticsConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    /// Directory of the file this config was read from
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub messages_dir: String,
    pub storage_dir: String,
    pub export_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            messages_dir: "~/.local/share/opencode/storage/message".to_string(),
            storage_dir: "~/.local/share/opencode/storage".to_string(),
            export_dir: "./exports".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds between live refreshes
    pub live_refresh_interval: u64,
    pub colors: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            live_refresh_interval: 5,
            colors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub config_file: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            config_file: "models.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub default_timeframe: Timeframe,
    pub recent_sessions_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_timeframe: Timeframe::Daily,
            recent_sessions_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub default_format: ExportFormat,
    /// Write a generator/timestamp header ahead of the data
    pub include_metadata: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::Csv,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Find and load the configuration, falling back to defaults when no
    /// file exists. An explicit or `$OCMON_CONFIG` path must exist.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(&path)?,
            None => match Self::search_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::load(&path)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(env::var(MESSAGES_DIR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Default locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml"), PathBuf::from("ocmon.toml")];
        paths.extend(default_user_config());
        paths
    }

    /// Read and validate a single config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| OcmonError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content, path)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        info!(config_file = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|source| OcmonError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides on top of file values
    pub fn apply_overrides(&mut self, messages_dir: Option<String>) {
        if let Some(dir) = messages_dir.filter(|d| !d.is_empty()) {
            debug!(messages_dir = %dir, "Overriding messages directory");
            self.paths.messages_dir = dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !REFRESH_INTERVAL_RANGE.contains(&self.ui.live_refresh_interval) {
            return Err(OcmonError::InvalidConfig {
                message: format!(
                    "ui.live_refresh_interval must be between 1 and 60 seconds, got {}",
                    self.ui.live_refresh_interval
                ),
            });
        }

        if !RECENT_SESSIONS_RANGE.contains(&self.analytics.recent_sessions_limit) {
            return Err(OcmonError::InvalidConfig {
                message: format!(
                    "analytics.recent_sessions_limit must be between 1 and 1000, got {}",
                    self.analytics.recent_sessions_limit
                ),
            });
        }

        if self.analytics.default_timeframe == Timeframe::All {
            return Err(OcmonError::InvalidConfig {
                message: "analytics.default_timeframe must be daily, weekly or monthly"
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn messages_dir(&self) -> PathBuf {
        expand_home(&self.paths.messages_dir)
    }

    pub fn storage_dir(&self) -> PathBuf {
        expand_home(&self.paths.storage_dir)
    }

    pub fn export_dir(&self) -> PathBuf {
        expand_home(&self.paths.export_dir)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.ui.live_refresh_interval)
    }

    /// Pricing file, relative paths resolved against the config file's directory
    pub fn pricing_path(&self) -> PathBuf {
        let path = expand_home(&self.models.config_file);
        match &self.base_dir {
            Some(base) => resolve_relative(&path, base),
            None => path,
        }
    }

    pub fn load_pricing(&self) -> Result<PricingTable> {
        PricingTable::load(&self.pricing_path())
    }

    pub fn session_loader(&self) -> SessionLoader {
        SessionLoader::new(self.messages_dir()).with_storage_dir(self.storage_dir())
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.export_dir()).with_metadata(self.export.include_metadata)
    }
}
