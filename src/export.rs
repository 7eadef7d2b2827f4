//! Flat export rows for every report, written out as CSV or JSON.
//!
//! Rows are `serde_json` maps keyed by column name. CSV columns come out in
//! sorted key order; costs keep their full decimal precision as strings.

use crate::analytics::{
    DailyUsage, ModelBreakdownReport, MonthlyUsage, ProjectBreakdownReport, WeeklyUsage,
};
use crate::error::{OcmonError, Result};
use crate::types::{Cost, ModelId, PricingTable, Session, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub type ExportRow = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which report an export holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportKind {
    Session,
    Sessions,
    Daily,
    Weekly,
    Monthly,
    Models,
    Projects,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Session => "session",
            ReportKind::Sessions => "sessions",
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
            ReportKind::Models => "models",
            ReportKind::Projects => "projects",
        };
        f.write_str(name)
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> ExportRow {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn with_tokens(mut row: ExportRow, tokens: TokenUsage) -> ExportRow {
    row.insert("input_tokens".into(), tokens.input.into());
    row.insert("output_tokens".into(), tokens.output.into());
    row.insert("cache_write_tokens".into(), tokens.cache_write.into());
    row.insert("cache_read_tokens".into(), tokens.cache_read.into());
    row.insert("total_tokens".into(), tokens.total().into());
    row
}

fn cost(cost: Cost) -> Value {
    Value::String(cost.value().normalize().to_string())
}

fn timestamp(at: Option<DateTime<Utc>>) -> Value {
    at.map_or(Value::Null, |at| Value::String(at.to_rfc3339()))
}

fn joined<'a>(models: impl IntoIterator<Item = &'a ModelId>) -> Value {
    let names: Vec<&str> = models.into_iter().map(ModelId::as_str).collect();
    Value::String(names.join(", "))
}

/// One row per interaction of `session`
pub fn session_rows(session: &Session, pricing: &PricingTable) -> Vec<ExportRow> {
    session
        .interactions()
        .map(|interaction| {
            let span = interaction.time_span();
            let row = fields([
                ("session_id", json!(interaction.session_id().as_str())),
                ("file_name", json!(interaction.file_name())),
                ("model_id", json!(interaction.model_id().as_str())),
                ("cost", cost(interaction.cost(pricing))),
                (
                    "created_time",
                    timestamp(span.and_then(|s| s.created_datetime())),
                ),
                (
                    "completed_time",
                    timestamp(span.and_then(|s| s.completed_datetime())),
                ),
                ("duration_ms", json!(interaction.duration_ms())),
            ]);
            with_tokens(row, interaction.tokens())
        })
        .collect()
}

pub fn sessions_rows<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    pricing: &PricingTable,
) -> Vec<ExportRow> {
    sessions
        .into_iter()
        .map(|session| {
            let row = fields([
                ("session_id", json!(session.session_id().as_str())),
                ("title", json!(session.title())),
                ("project", json!(session.project_name())),
                ("start_time", timestamp(session.start_time())),
                ("end_time", timestamp(session.end_time())),
                ("duration_ms", json!(session.duration_ms())),
                ("interaction_count", json!(session.interaction_count())),
                ("models_used", joined(session.models_used())),
                ("cost", cost(session.total_cost(pricing))),
            ]);
            with_tokens(row, session.total_tokens())
        })
        .collect()
}

pub fn daily_rows(days: &[DailyUsage<'_>], pricing: &PricingTable) -> Vec<ExportRow> {
    days.iter()
        .map(|day| {
            let row = fields([
                ("date", json!(day.date.to_string())),
                ("sessions", json!(day.sessions.len())),
                ("interactions", json!(day.total_interactions())),
                ("models_used", joined(day.models_used())),
                ("cost", cost(day.total_cost(pricing))),
            ]);
            with_tokens(row, day.total_tokens())
        })
        .collect()
}

pub fn weekly_rows(weeks: &[WeeklyUsage<'_>], pricing: &PricingTable) -> Vec<ExportRow> {
    weeks
        .iter()
        .map(|week| {
            let row = fields([
                ("year", json!(week.year)),
                ("week", json!(week.week)),
                ("start_date", json!(week.start_date.to_string())),
                ("end_date", json!(week.end_date.to_string())),
                ("sessions", json!(week.total_sessions())),
                ("interactions", json!(week.total_interactions())),
                ("cost", cost(week.total_cost(pricing))),
            ]);
            with_tokens(row, week.total_tokens())
        })
        .collect()
}

pub fn monthly_rows(months: &[MonthlyUsage<'_>], pricing: &PricingTable) -> Vec<ExportRow> {
    months
        .iter()
        .map(|month| {
            let row = fields([
                ("month", json!(format!("{}-{:02}", month.year, month.month))),
                ("sessions", json!(month.total_sessions())),
                ("interactions", json!(month.total_interactions())),
                ("cost", cost(month.total_cost(pricing))),
            ]);
            with_tokens(row, month.total_tokens())
        })
        .collect()
}

pub fn model_rows(report: &ModelBreakdownReport) -> Vec<ExportRow> {
    report
        .models
        .iter()
        .map(|stats| {
            let row = fields([
                ("model", json!(stats.model.as_str())),
                ("sessions", json!(stats.sessions)),
                ("interactions", json!(stats.interactions)),
                ("cost", cost(stats.cost)),
                ("first_used", timestamp(stats.first_used)),
                ("last_used", timestamp(stats.last_used)),
            ]);
            with_tokens(row, stats.tokens)
        })
        .collect()
}

pub fn project_rows(report: &ProjectBreakdownReport) -> Vec<ExportRow> {
    report
        .projects
        .iter()
        .map(|stats| {
            let path = stats
                .project_path
                .as_ref()
                .map(|p| p.display().to_string());
            let row = fields([
                ("project", json!(stats.project_name)),
                ("project_path", json!(path)),
                ("sessions", json!(stats.sessions)),
                ("interactions", json!(stats.interactions)),
                ("cost", cost(stats.cost)),
                ("avg_cost_per_session", cost(stats.avg_cost_per_session())),
                ("models_used", joined(&stats.models_used)),
                ("first_activity", timestamp(stats.first_activity)),
                ("last_activity", timestamp(stats.last_activity)),
            ]);
            with_tokens(row, stats.tokens)
        })
        .collect()
}

/// Header information written ahead of the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportMetadata {
    pub report: ReportKind,
    pub generated_at: DateTime<Utc>,
}

fn csv_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_field(text: &str) -> Cow<'_, str> {
    if text.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", text.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(text)
    }
}

/// Write `rows` as CSV. The header is the union of all row keys.
pub fn write_csv<W: Write>(
    mut out: W,
    rows: &[ExportRow],
    metadata: Option<&ExportMetadata>,
) -> io::Result<()> {
    if let Some(meta) = metadata {
        writeln!(out, "# ocmon {} export", meta.report)?;
        writeln!(out, "# Generated: {}", meta.generated_at.to_rfc3339())?;
        writeln!(out, "# Records: {}", rows.len())?;
        writeln!(out, "#")?;
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let header: Vec<Cow<'_, str>> = columns.iter().map(|c| csv_field(c)).collect();
    writeln!(out, "{}", header.join(","))?;

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .map(|c| csv_field(&csv_text(row.get(*c))).into_owned())
            .collect();
        writeln!(out, "{}", line.join(","))?;
    }

    out.flush()
}

/// Rows as a JSON array, or wrapped with metadata and a record count
pub fn to_json(rows: &[ExportRow], metadata: Option<&ExportMetadata>) -> Value {
    let data = Value::Array(rows.iter().cloned().map(Value::Object).collect());
    match metadata {
        Some(meta) => json!({
            "metadata": {
                "generated_by": "ocmon",
                "version": env!("CARGO_PKG_VERSION"),
                "report": meta.report.to_string(),
                "generated_at": meta.generated_at.to_rfc3339(),
            },
            "data": data,
            "record_count": rows.len(),
        }),
        None => data,
    }
}

/// Where an export went and how big it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Writes report rows into an export directory
#[derive(Debug, Clone)]
pub struct Exporter {
    export_dir: PathBuf,
    include_metadata: bool,
}

impl Exporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            include_metadata: true,
        }
    }

    pub fn with_metadata(mut self, include_metadata: bool) -> Self {
        self.include_metadata = include_metadata;
        self
    }

    /// Target file for an export.
    ///
    /// Bare file names land in the export directory; paths with a directory
    /// part are used as given. The format's extension is appended when the
    /// name does not already end with it. Without a name the file is called
    /// `ocmon_<report>_<YYYYmmdd_HHMMSS>`.
    pub fn output_path(
        &self,
        output: Option<&Path>,
        format: ExportFormat,
        metadata: &ExportMetadata,
    ) -> PathBuf {
        let path = match output {
            Some(path) if path.is_absolute() || has_directory(path) => path.to_path_buf(),
            Some(name) => self.export_dir.join(name),
            None => self.export_dir.join(format!(
                "ocmon_{}_{}",
                metadata.report,
                metadata.generated_at.format("%Y%m%d_%H%M%S")
            )),
        };

        if path.extension().is_some_and(|ext| ext == format.extension()) {
            return path;
        }
        let mut name = OsString::from(path);
        name.push(".");
        name.push(format.extension());
        PathBuf::from(name)
    }

    pub fn export(
        &self,
        rows: &[ExportRow],
        format: ExportFormat,
        output: Option<&Path>,
        metadata: &ExportMetadata,
    ) -> Result<ExportOutcome> {
        if rows.is_empty() {
            return Err(OcmonError::EmptyExport {
                report: metadata.report.to_string(),
            });
        }

        let path = self.output_path(output, format, metadata);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| OcmonError::DirectoryAccess {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let header = self.include_metadata.then_some(metadata);
        let contents = match format {
            ExportFormat::Csv => {
                let mut buf = Vec::new();
                write_csv(&mut buf, rows, header).map_err(|source| OcmonError::FileWrite {
                    path: path.clone(),
                    source,
                })?;
                buf
            }
            ExportFormat::Json => {
                let mut text = serde_json::to_string_pretty(&to_json(rows, header)).map_err(
                    |source| OcmonError::JsonWrite {
                        path: path.clone(),
                        source,
                    },
                )?;
                text.push('\n');
                text.into_bytes()
            }
        };

        fs::write(&path, &contents).map_err(|source| OcmonError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), rows = rows.len(), "export written");

        Ok(ExportOutcome {
            path,
            rows: rows.len(),
            bytes: contents.len() as u64,
        })
    }
}

fn has_directory(path: &Path) -> bool {
    path.parent().is_some_and(|p| !p.as_os_str().is_empty())
}
