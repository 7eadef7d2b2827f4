use super::interaction::Interaction;
use super::pricing::PricingTable;
use crate::constants::DEFAULT_CONTEXT_WINDOW;
use crate::formatting::format_number_with_commas;
use colored::Colorize;
use std::fmt;

/// Context window occupancy of a single interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextUsage {
    context_size: u64,
    context_window: u64,
}

impl ContextUsage {
    pub fn new(context_size: u64, context_window: u64) -> Self {
        Self {
            context_size,
            context_window,
        }
    }

    /// Input plus cache tokens of `interaction`, against the window of its
    /// model (or the default window when the model is not priced)
    pub fn from_interaction(interaction: &Interaction, pricing: &PricingTable) -> Self {
        let context_window = pricing
            .get(interaction.model_id().as_str())
            .map(|p| p.context_window())
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);

        Self::new(interaction.tokens().context_size(), context_window)
    }

    pub fn context_size(&self) -> u64 {
        self.context_size
    }

    pub fn context_window(&self) -> u64 {
        self.context_window
    }

    /// Usage percentage, capped at 100
    pub fn percentage(&self) -> f64 {
        if self.context_window == 0 {
            return 0.0;
        }
        (self.context_size as f64 * 100.0 / self.context_window as f64).min(100.0)
    }

    /// Get formatted string with color coding for terminal output
    pub fn to_colored_string(&self) -> String {
        let percentage = self.percentage();
        let percentage_str = format!("{:.0}%", percentage);
        let percentage_str = if percentage >= 95.0 {
            percentage_str.red()
        } else if percentage >= 85.0 {
            percentage_str.yellow()
        } else if percentage >= 70.0 {
            percentage_str.magenta()
        } else {
            percentage_str.green()
        };

        format!(
            "{} ({} / {})",
            percentage_str,
            format_number_with_commas(self.context_size),
            format_number_with_commas(self.context_window)
        )
    }
}

impl fmt::Display for ContextUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0}% ({} / {})",
            self.percentage(),
            format_number_with_commas(self.context_size),
            format_number_with_commas(self.context_window)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelPricing, TokenUsage};
    use rust_decimal::Decimal;

    #[test]
    fn test_from_interaction_uses_model_window() {
        let mut pricing = PricingTable::new();
        let mut rates =
            ModelPricing::per_million(Decimal::ONE, Decimal::ONE, Decimal::ONE, Decimal::ONE);
        rates.context_window = Some(100_000);
        pricing.insert("small", rates);

        let tokens = TokenUsage::new(20_000, 9_999, 5_000, 25_000);
        let interaction = Interaction::new("s", "a.json", "small", tokens);
        let usage = ContextUsage::from_interaction(&interaction, &pricing);

        assert_eq!(usage.context_size(), 50_000);
        assert_eq!(usage.context_window(), 100_000);
        assert_eq!(usage.percentage(), 50.0);
    }

    #[test]
    fn test_unpriced_model_uses_default_window() {
        let interaction = Interaction::new("s", "a.json", "other", TokenUsage::new(1_000, 0, 0, 0));
        let usage = ContextUsage::from_interaction(&interaction, &PricingTable::new());
        assert_eq!(usage.context_window(), DEFAULT_CONTEXT_WINDOW);
    }

    #[test]
    fn test_percentage_is_capped() {
        assert_eq!(ContextUsage::new(500_000, 200_000).percentage(), 100.0);
        assert_eq!(ContextUsage::new(10, 0).percentage(), 0.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ContextUsage::new(150_000, 200_000).to_string(),
            "75% (150,000 / 200,000)"
        );
        assert!(
            ContextUsage::new(150_000, 200_000)
                .to_colored_string()
                .contains("150,000 / 200,000")
        );
    }
}
