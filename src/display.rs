//! Terminal rendering for the report commands.
//!
//! Every function returns the finished text so the binary only prints it.

use crate::analytics::{
    DailyUsage, ModelBreakdownReport, MonthlyUsage, ProjectBreakdownReport, SessionHealth,
    SessionsSummary, WeeklyUsage,
};
use crate::config::Config;
use crate::formatting::{
    format_duration, format_number_with_commas, format_percentage, format_relative_time,
    format_timestamp_in,
};
use crate::types::{Cost, PricingTable, Session, TokenUsage};
use crate::utils::time::format_date_range;
use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Write;

const RULE_WIDTH: usize = 72;

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH).bright_cyan());
    let _ = writeln!(out, "{}", title.bright_white().bold());
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH).bright_cyan());
}

fn as_f64(cost: Cost) -> f64 {
    cost.value().to_f64().unwrap_or(0.0)
}

fn share(part: Cost, total: Cost) -> String {
    format_percentage(as_f64(part), as_f64(total), 1)
}

fn tokens(usage: TokenUsage) -> String {
    format_number_with_commas(usage.total())
}

fn timestamp<Tz: TimeZone>(at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format_timestamp_in(at.map(|t| t.timestamp_millis()), tz)
}

fn totals_line(out: &mut String, sessions: usize, usage: TokenUsage, cost: Cost) {
    let _ = writeln!(
        out,
        "\n📊 Total: {} sessions • {} tokens • {}",
        sessions.to_string().bright_white().bold(),
        tokens(usage).bright_white(),
        cost.to_string().bright_green().bold()
    );
}

/// Details of one session: timing, totals, per-model split and health
pub fn session_report<Tz: TimeZone>(
    session: &Session,
    pricing: &PricingTable,
    health: &SessionHealth,
    tz: &Tz,
    now: DateTime<Utc>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let title = match session.title() {
        Some(title) => format!("Session {} ({title})", session.session_id()),
        None => format!("Session {}", session.session_id()),
    };
    heading(&mut out, &title);

    let stats = session.statistics(pricing);
    let usage = stats.total_tokens;
    let _ = writeln!(out, "  Project:      {}", session.project_name().cyan());
    let _ = writeln!(out, "  Started:      {}", timestamp(session.start_time(), tz));
    if let Some(end) = session.end_time() {
        let _ = writeln!(
            out,
            "  Last active:  {} ({})",
            timestamp(Some(end), tz),
            format_relative_time(end, now)
        );
    }
    let _ = writeln!(out, "  Duration:     {}", format_duration(stats.duration_ms));
    let _ = writeln!(out, "  Interactions: {}", stats.interaction_count);
    let _ = writeln!(
        out,
        "  Tokens:       {} (in {} / out {} / cache write {} / cache read {})",
        tokens(usage),
        format_number_with_commas(usage.input),
        format_number_with_commas(usage.output),
        format_number_with_commas(usage.cache_write),
        format_number_with_commas(usage.cache_read)
    );
    let _ = writeln!(
        out,
        "  Cost:         {} ({} per interaction)",
        stats.total_cost.to_string().bright_green().bold(),
        stats.avg_cost_per_interaction
    );

    let breakdown = session.model_breakdown(pricing);
    if !breakdown.is_empty() {
        let _ = writeln!(out, "\n  {}", "Models:".bold());
        for (model, usage) in &breakdown {
            let _ = writeln!(
                out,
                "    {:<32} {:>5} calls {:>14} tok {:>10} {:>7}",
                model.as_str(),
                usage.interactions,
                tokens(usage.tokens),
                usage.cost.to_string(),
                share(usage.cost, stats.total_cost)
            );
        }
    }

    if health.is_healthy() {
        let _ = writeln!(out, "\n  {}", "✓ No issues found".green());
    } else {
        let _ = writeln!(out, "\n  {}", "Warnings:".yellow().bold());
        for warning in &health.warnings {
            let _ = writeln!(out, "    ⚠ {warning}");
        }
    }
    out
}

/// One line per session, newest first as given, under a summary header
pub fn sessions_report<Tz: TimeZone>(
    sessions: &[Session],
    summary: &SessionsSummary,
    pricing: &PricingTable,
    tz: &Tz,
    now: DateTime<Utc>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    heading(&mut out, "OpenCode Sessions");
    let _ = writeln!(
        out,
        "  {} • {} interactions • {} models",
        summary.date_range_label(tz),
        summary.total_interactions,
        summary.models_used.len()
    );
    let _ = writeln!(out);

    for session in sessions {
        let last = session
            .end_time()
            .map(|end| format_relative_time(end, now))
            .unwrap_or_else(|| "N/A".to_string());
        let label = session
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| session.session_id().to_string());
        let _ = writeln!(
            out,
            "  {}  {:<32} {:<16} {:>5} {:>14} {:>10}  {}",
            timestamp(session.start_time(), tz).dimmed(),
            label,
            session.project_name(),
            session.interaction_count(),
            tokens(session.total_tokens()),
            session.total_cost(pricing).to_string(),
            last.dimmed()
        );
    }

    totals_line(
        &mut out,
        summary.total_sessions,
        summary.total_tokens,
        summary.total_cost,
    );
    out
}

pub fn daily_report(days: &[DailyUsage<'_>], pricing: &PricingTable) -> String {
    let mut out = String::new();
    heading(&mut out, "Daily Usage");

    let mut total = (0, TokenUsage::ZERO, Cost::ZERO);
    for day in days {
        let cost = day.total_cost(pricing);
        let models: Vec<&str> = day.models_used().into_iter().map(|m| m.as_str()).collect();
        let _ = writeln!(
            out,
            "📅 {}  {:>4} sessions {:>6} calls {:>14} tok {:>10}  {}",
            day.date.to_string().bright_white().bold(),
            day.sessions.len(),
            day.total_interactions(),
            tokens(day.total_tokens()),
            cost.to_string().bright_green(),
            models.join(", ").dimmed()
        );
        total.0 += day.sessions.len();
        total.1 += day.total_tokens();
        total.2 += cost;
    }

    totals_line(&mut out, total.0, total.1, total.2);
    out
}

pub fn weekly_report(weeks: &[WeeklyUsage<'_>], pricing: &PricingTable) -> String {
    let mut out = String::new();
    heading(&mut out, "Weekly Usage");

    let mut total = (0, TokenUsage::ZERO, Cost::ZERO);
    for week in weeks {
        let cost = week.total_cost(pricing);
        let _ = writeln!(
            out,
            "📅 {}  {}  {:>4} sessions {:>6} calls {:>14} tok {:>10}",
            format!("{}-W{:02}", week.year, week.week).bright_white().bold(),
            format_date_range(Some(week.start_date), Some(week.end_date)).dimmed(),
            week.total_sessions(),
            week.total_interactions(),
            tokens(week.total_tokens()),
            cost.to_string().bright_green()
        );
        total.0 += week.total_sessions();
        total.1 += week.total_tokens();
        total.2 += cost;
    }

    totals_line(&mut out, total.0, total.1, total.2);
    out
}

pub fn monthly_report(months: &[MonthlyUsage<'_>], pricing: &PricingTable) -> String {
    let mut out = String::new();
    heading(&mut out, "Monthly Usage");

    let mut total = (0, TokenUsage::ZERO, Cost::ZERO);
    for month in months {
        let cost = month.total_cost(pricing);
        let _ = writeln!(
            out,
            "📅 {}  {:>4} sessions {:>6} calls {:>14} tok {:>10}",
            format!("{}-{:02}", month.year, month.month)
                .bright_white()
                .bold(),
            month.total_sessions(),
            month.total_interactions(),
            tokens(month.total_tokens()),
            cost.to_string().bright_green()
        );
        total.0 += month.total_sessions();
        total.1 += month.total_tokens();
        total.2 += cost;
    }

    totals_line(&mut out, total.0, total.1, total.2);
    out
}

pub fn models_report(report: &ModelBreakdownReport) -> String {
    let mut out = String::new();
    heading(
        &mut out,
        &format!(
            "Model Usage ({}, {})",
            report.timeframe,
            format_date_range(report.filter.start, report.filter.end)
        ),
    );

    let total_cost = report.total_cost();
    for stats in &report.models {
        let _ = writeln!(
            out,
            "  {:<32} {:>4} sessions {:>6} calls {:>14} tok {:>10} {:>7}",
            stats.model.as_str().cyan(),
            stats.sessions,
            stats.interactions,
            tokens(stats.tokens),
            stats.cost.to_string().bright_green(),
            share(stats.cost, total_cost)
        );
    }

    if let Some(top) = report.top_model() {
        let _ = writeln!(out, "\n  Top model: {}", top.model.as_str().bold());
    }
    let _ = writeln!(
        out,
        "  Total: {} tokens • {}",
        tokens(report.total_tokens()),
        total_cost.to_string().bright_green().bold()
    );
    out
}

pub fn projects_report(report: &ProjectBreakdownReport) -> String {
    let mut out = String::new();
    heading(
        &mut out,
        &format!(
            "Project Usage ({}, {})",
            report.timeframe,
            format_date_range(report.filter.start, report.filter.end)
        ),
    );

    let total_cost = report.total_cost();
    for stats in &report.projects {
        let _ = writeln!(
            out,
            "  {:<24} {:>4} sessions {:>6} calls {:>14} tok {:>10} {:>7}  avg {}",
            stats.project_name.cyan(),
            stats.sessions,
            stats.interactions,
            tokens(stats.tokens),
            stats.cost.to_string().bright_green(),
            share(stats.cost, total_cost),
            stats.avg_cost_per_session()
        );
    }

    let _ = writeln!(
        out,
        "\n  Total: {} projects • {} tokens • {}",
        report.projects.len(),
        tokens(report.total_tokens()),
        total_cost.to_string().bright_green().bold()
    );
    out
}

/// Effective configuration and the models the pricing table knows
pub fn config_summary(config: &Config, pricing: &PricingTable) -> String {
    let mut out = String::new();
    heading(&mut out, "Current Configuration");

    let _ = writeln!(out, "📁 Paths:");
    let _ = writeln!(out, "  Messages directory: {}", config.messages_dir().display());
    let _ = writeln!(out, "  Storage directory:  {}", config.storage_dir().display());
    let _ = writeln!(out, "  Export directory:   {}", config.export_dir().display());
    let _ = writeln!(out, "  Pricing file:       {}", config.pricing_path().display());
    let _ = writeln!(out, "\n🎨 UI:");
    let _ = writeln!(out, "  Colors: {}", config.ui.colors);
    let _ = writeln!(
        out,
        "  Live refresh interval: {}s",
        config.ui.live_refresh_interval
    );
    let _ = writeln!(out, "\n📈 Analytics:");
    let _ = writeln!(
        out,
        "  Default timeframe: {}",
        config.analytics.default_timeframe
    );
    let _ = writeln!(
        out,
        "  Recent sessions limit: {}",
        config.analytics.recent_sessions_limit
    );
    let _ = writeln!(out, "\n📤 Export:");
    let _ = writeln!(out, "  Default format: {}", config.export.default_format);
    let _ = writeln!(out, "  Include metadata: {}", config.export.include_metadata);
    let _ = writeln!(out, "\n🤖 Models: {} configured", pricing.len());

    let mut models: Vec<&str> = pricing.models().map(|m| m.as_str()).collect();
    models.sort_unstable();
    for model in models {
        let _ = writeln!(out, "  - {model}");
    }
    out
}
