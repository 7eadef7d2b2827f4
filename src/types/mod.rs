pub mod burn_rate;
pub mod context_usage;
pub mod cost;
pub mod ids;
pub mod interaction;
pub mod pricing;
pub mod session;
pub mod time_span;
pub mod tokens;

pub use burn_rate::BurnRate;
pub use context_usage::ContextUsage;
pub use cost::Cost;
pub use ids::{ModelId, SessionId};
pub use interaction::{Extensions, Interaction, InteractionRecord};
pub use pricing::{ModelPricing, PricingTable};
pub use session::{ModelBreakdown, Session, SessionStatistics, SharedSession};
pub use time_span::TimeSpan;
pub use tokens::TokenUsage;
