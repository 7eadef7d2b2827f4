use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ocmon::analytics::{
    DateFilter, Timeframe, check_session_health, daily_breakdown, filter_sessions_by_date,
    model_breakdown, monthly_breakdown, project_breakdown, summarize, weekly_breakdown,
};
use ocmon::display;
use ocmon::export::{self, ExportMetadata, ExportRow};
use ocmon::formatting::{format_duration, format_number_with_commas};
use ocmon::monitor::{LiveMonitor, MonitorSnapshot, RefreshOutcome};
use ocmon::utils::time::{month_range, parse_date, parse_month, year_range};
use ocmon::{
    Config, ExportFormat, OcmonError, PricingTable, ReportKind, Result, Session, SessionLoader,
};

type Monitor = LiveMonitor<SessionLoader>;

#[derive(Parser, Debug)]
#[command(
    name = "ocmon",
    version,
    about = "Token usage and cost monitor for OpenCode sessions"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    // `status` when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One-line status of the most recent session
    Status,
    /// Re-render the status line until Ctrl-C
    Live {
        /// Seconds between refreshes (overrides ui.live_refresh_interval)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=60))]
        interval: Option<u64>,
    },
    #[command(flatten)]
    Report(ReportCommand),
    /// Write a report to a CSV or JSON file
    Export {
        #[arg(value_enum)]
        report: ReportKind,
        /// Defaults to export.default_format
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,
        /// File name inside the export directory, or a path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Reports printed to stdout as text or JSON
#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Analyze a single session
    Session {
        /// Session directory (defaults to the most recent session)
        path: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Summarize the most recent sessions
    Sessions {
        /// Number of sessions (defaults to analytics.recent_sessions_limit)
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Usage per day
    Daily {
        /// Only this month (YYYY-MM)
        #[arg(long, value_parser = month_arg)]
        month: Option<(i32, u32)>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Usage per ISO week
    Weekly {
        /// Only this year
        #[arg(long)]
        year: Option<i32>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Usage per month
    Monthly {
        /// Only this year
        #[arg(long)]
        year: Option<i32>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Usage per model, most expensive first
    Models(BreakdownArgs),
    /// Usage per project, most expensive first
    Projects(BreakdownArgs),
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
struct BreakdownArgs {
    /// Current period to report (defaults to analytics.default_timeframe)
    #[arg(short, long, value_enum)]
    timeframe: Option<Timeframe>,
    /// First day to include (YYYY-MM-DD); overrides the timeframe window
    #[arg(long, value_parser = date_arg)]
    start_date: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD); overrides the timeframe window
    #[arg(long, value_parser = date_arg)]
    end_date: Option<NaiveDate>,
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("expected YYYY-MM-DD, got '{s}'"))
}

fn month_arg(s: &str) -> std::result::Result<(i32, u32), String> {
    parse_month(s).ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))
}

impl BreakdownArgs {
    /// Explicit dates win; otherwise the timeframe picks the current period
    fn filter(&self, default_timeframe: Timeframe, today: NaiveDate) -> (Timeframe, DateFilter) {
        let timeframe = self.timeframe.unwrap_or(default_timeframe);
        if self.start_date.is_some() || self.end_date.is_some() {
            return (timeframe, DateFilter::new(self.start_date, self.end_date));
        }
        (timeframe, timeframe.current_filter(today))
    }
}

fn range_filter(range: Option<(NaiveDate, NaiveDate)>) -> DateFilter {
    range.map(DateFilter::from_range).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loader parses interaction files on the global rayon pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .thread_name(|i| format!("ocmon-worker-{}", i))
        .build_global()?;

    let config = Config::discover(cli.config.as_deref())?;

    ocmon::logging::init_logging(&config.logging.level);
    colored::control::set_override(config.ui.colors);

    let pricing = config.load_pricing()?;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            let monitor = Arc::new(LiveMonitor::new(config.session_loader()));
            refresh(&monitor).await?;
            println!("{}", status_line(&monitor, &pricing)?);
        }
        Command::Live { interval } => {
            let monitor = Arc::new(LiveMonitor::new(config.session_loader()));
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.refresh_interval());
            run_live(monitor, pricing, interval).await?;
        }
        Command::Config(ConfigCommand::Show) => {
            print!("{}", display::config_summary(&config, &pricing));
        }
        Command::Export {
            report,
            format,
            output,
        } => {
            let format = format.unwrap_or(config.export.default_format);
            run_export(&config, &pricing, report, format, output.as_deref()).await?;
        }
        Command::Report(report) => run_report(&config, &pricing, report).await?,
    }

    Ok(())
}

async fn load_sessions(config: &Config, limit: Option<usize>) -> Result<Vec<Session>> {
    config.session_loader().load_all_sessions_async(limit).await
}

async fn load_one_session(config: &Config, path: Option<PathBuf>) -> Result<Option<Session>> {
    let loader = config.session_loader();
    tokio::task::spawn_blocking(move || match path {
        Some(path) => Ok(loader.load_session(&path)),
        None => loader.most_recent_session(),
    })
    .await?
}

fn print_json(rows: &[ExportRow]) -> Result<()> {
    let text = serde_json::to_string_pretty(&export::to_json(rows, None)).map_err(|source| {
        OcmonError::JsonWrite {
            path: PathBuf::from("<stdout>"),
            source,
        }
    })?;
    println!("{text}");
    Ok(())
}

async fn run_report(config: &Config, pricing: &PricingTable, report: ReportCommand) -> Result<()> {
    let today = Local::now().date_naive();
    let now = Utc::now();

    match report {
        ReportCommand::Session { path, format } => {
            let Some(session) = load_one_session(config, path).await? else {
                eprintln!("{}", "No session data found".yellow());
                return Ok(());
            };
            match format {
                OutputFormat::Json => print_json(&export::session_rows(&session, pricing))?,
                OutputFormat::Table => {
                    let health = check_session_health(&session, pricing);
                    print!(
                        "{}",
                        display::session_report(&session, pricing, &health, &Local, now)
                    );
                }
            }
        }
        ReportCommand::Sessions { limit, format } => {
            let limit = limit.unwrap_or(config.analytics.recent_sessions_limit);
            let sessions = load_sessions(config, Some(limit)).await?;
            match format {
                OutputFormat::Json => print_json(&export::sessions_rows(&sessions, pricing))?,
                OutputFormat::Table => {
                    let summary = summarize(&sessions, pricing);
                    print!(
                        "{}",
                        display::sessions_report(&sessions, &summary, pricing, &Local, now)
                    );
                }
            }
        }
        ReportCommand::Daily { month, format } => {
            let sessions = load_sessions(config, None).await?;
            let filter = range_filter(month.and_then(|(y, m)| month_range(y, m)));
            let days = daily_breakdown(filter_sessions_by_date(&sessions, filter, &Local), &Local);
            match format {
                OutputFormat::Json => print_json(&export::daily_rows(&days, pricing))?,
                OutputFormat::Table => print!("{}", display::daily_report(&days, pricing)),
            }
        }
        ReportCommand::Weekly { year, format } => {
            let sessions = load_sessions(config, None).await?;
            let filter = range_filter(year.and_then(year_range));
            let days = daily_breakdown(filter_sessions_by_date(&sessions, filter, &Local), &Local);
            let weeks = weekly_breakdown(days);
            match format {
                OutputFormat::Json => print_json(&export::weekly_rows(&weeks, pricing))?,
                OutputFormat::Table => print!("{}", display::weekly_report(&weeks, pricing)),
            }
        }
        ReportCommand::Monthly { year, format } => {
            let sessions = load_sessions(config, None).await?;
            let filter = range_filter(year.and_then(year_range));
            let days = daily_breakdown(filter_sessions_by_date(&sessions, filter, &Local), &Local);
            let months = monthly_breakdown(weekly_breakdown(days));
            match format {
                OutputFormat::Json => print_json(&export::monthly_rows(&months, pricing))?,
                OutputFormat::Table => print!("{}", display::monthly_report(&months, pricing)),
            }
        }
        ReportCommand::Models(args) => {
            let sessions = load_sessions(config, None).await?;
            let (timeframe, filter) = args.filter(config.analytics.default_timeframe, today);
            let report = model_breakdown(&sessions, pricing, timeframe, filter, &Local);
            match args.format {
                OutputFormat::Json => print_json(&export::model_rows(&report))?,
                OutputFormat::Table => print!("{}", display::models_report(&report)),
            }
        }
        ReportCommand::Projects(args) => {
            let sessions = load_sessions(config, None).await?;
            let (timeframe, filter) = args.filter(config.analytics.default_timeframe, today);
            let report = project_breakdown(&sessions, pricing, timeframe, filter, &Local);
            match args.format {
                OutputFormat::Json => print_json(&export::project_rows(&report))?,
                OutputFormat::Table => print!("{}", display::projects_report(&report)),
            }
        }
    }

    Ok(())
}

/// Rows for `report` over every session, unfiltered
async fn export_rows(
    config: &Config,
    pricing: &PricingTable,
    report: ReportKind,
) -> Result<Vec<ExportRow>> {
    // Newest first, so the first entry is the most recent session
    let sessions = load_sessions(config, None).await?;
    let rows = match report {
        ReportKind::Session => sessions
            .first()
            .map(|session| export::session_rows(session, pricing))
            .unwrap_or_default(),
        ReportKind::Sessions => export::sessions_rows(&sessions, pricing),
        ReportKind::Daily => export::daily_rows(&daily_breakdown(&sessions, &Local), pricing),
        ReportKind::Weekly => {
            let weeks = weekly_breakdown(daily_breakdown(&sessions, &Local));
            export::weekly_rows(&weeks, pricing)
        }
        ReportKind::Monthly => {
            let weeks = weekly_breakdown(daily_breakdown(&sessions, &Local));
            export::monthly_rows(&monthly_breakdown(weeks), pricing)
        }
        ReportKind::Models => export::model_rows(&model_breakdown(
            &sessions,
            pricing,
            Timeframe::All,
            DateFilter::default(),
            &Local,
        )),
        ReportKind::Projects => export::project_rows(&project_breakdown(
            &sessions,
            pricing,
            Timeframe::All,
            DateFilter::default(),
            &Local,
        )),
    };
    Ok(rows)
}

async fn run_export(
    config: &Config,
    pricing: &PricingTable,
    report: ReportKind,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let rows = export_rows(config, pricing, report).await?;
    let metadata = ExportMetadata {
        report,
        generated_at: Utc::now(),
    };
    let outcome = config.exporter().export(&rows, format, output, &metadata)?;

    println!("{}", "✅ Export completed".green());
    println!("File: {}", outcome.path.display());
    println!("Size: {} bytes", format_number_with_commas(outcome.bytes));
    println!("Rows: {}", outcome.rows);
    Ok(())
}

async fn refresh(monitor: &Arc<Monitor>) -> Result<RefreshOutcome> {
    let monitor = Arc::clone(monitor);
    tokio::task::spawn_blocking(move || monitor.refresh()).await?
}

async fn run_live(monitor: Arc<Monitor>, pricing: PricingTable, interval: Duration) -> Result<()> {
    refresh(&monitor).await?;

    // Single writer: the only task that publishes new session versions
    let writer = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = refresh(&monitor).await {
                    tracing::warn!(error = %err, "Session refresh failed");
                }
            }
        })
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut render = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = render.tick() => {
                // Clear screen and home the cursor
                print!("\x1b[2J\x1b[H");
                println!("{}", status_line(&monitor, &pricing)?);
            }
            _ = &mut ctrl_c => break,
        }
    }

    writer.abort();
    println!("\n{}", "Live monitoring stopped.".yellow());
    Ok(())
}

fn status_line(monitor: &Monitor, pricing: &PricingTable) -> Result<String> {
    Ok(match monitor.snapshot(pricing, Utc::now())? {
        Some(snapshot) => render(&snapshot),
        None => "No OpenCode sessions found".dimmed().to_string(),
    })
}

fn render(snapshot: &MonitorSnapshot) -> String {
    let session = &snapshot.session;
    let label = session
        .title()
        .map(str::to_string)
        .unwrap_or_else(|| session.session_id().to_string());

    format!(
        "{reset}{project} {label}{model} 📊 {tokens} tok 💰 {cost} session\
         {quota}{burn_rate}{context} ⏱ {duration} {activity}",
        reset = "\x1b[0m",
        project = session.project_name().green(),
        label = label.cyan(),
        model = match &snapshot.recent_interaction {
            Some(recent) => format!(" 👤 {}", model_name(recent.model_id().as_str())),
            None => String::new(),
        },
        tokens = format_number_with_commas(snapshot.total_tokens.total()),
        cost = snapshot.total_cost,
        quota = match &snapshot.quota {
            Some(quota) => format!(" ({})", quota.to_colored_string()),
            None => String::new(),
        },
        burn_rate = match snapshot.burn_rate {
            Some(rate) => format!(" 🔥 {}", rate.to_colored_string()),
            None => String::new(),
        },
        context = match &snapshot.context {
            Some(context) => format!(" ⚖️ {}", context.to_colored_string()),
            None => String::new(),
        },
        duration = format_duration(session.duration_ms()),
        activity = snapshot.activity.to_colored_string(),
    )
}

#[inline]
fn model_name(model: &str) -> ColoredString {
    if model.to_lowercase().contains("opus") {
        model.white()
    } else {
        model.yellow().bold()
    }
}
