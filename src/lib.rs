// Module declarations
pub mod analytics;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod export;
pub mod formatting;
pub mod logging;
pub mod monitor;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{OcmonError, Result};
pub use export::{ExportFormat, Exporter, ReportKind};
pub use monitor::{LiveMonitor, MonitorSnapshot, SessionSource};
pub use types::{
    BurnRate, ContextUsage, Cost, Interaction, InteractionRecord, ModelId, ModelPricing,
    PricingTable, Session, SessionId, SharedSession, TimeSpan, TokenUsage,
};
pub use utils::SessionLoader;
