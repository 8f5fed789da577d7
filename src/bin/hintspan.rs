//! Binary entry point for the hintspan CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;

use hintspan::config::SpanConfig;
use hintspan::connector::FixtureFactory;
use hintspan::search::{ExplorationMode, SearchStats, SpanEntryReport};
use hintspan::storage::{SpanStore, SqliteSpanStore, StoredDependency, StoredHintSet};
use hintspan::{run_query_span, telemetry, SpanSearch};

#[derive(Parser, Debug)]
#[command(
    name = "hintspan",
    version,
    about = "Approximate the query span of SQL queries",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Compute and store the span of each query")]
    Span(SpanCmd),

    #[command(about = "Print the stored span of a query")]
    Show(ShowCmd),
}

#[derive(Args, Debug)]
struct SpanCmd {
    #[arg(long, value_name = "FILE", help = "JSON catalogue of recorded explains")]
    fixture: PathBuf,

    #[arg(long, value_name = "FILE", help = "Override the span database")]
    db: Option<PathBuf>,

    #[arg(long, help = "Override the number of concurrent explains")]
    threads: Option<usize>,

    #[arg(long, value_enum, help = "Override the exploration strategy")]
    mode: Option<ModeArg>,

    #[arg(value_name = "QUERY", required = true)]
    queries: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct ShowCmd {
    #[arg(long, value_name = "FILE", help = "Override the span database")]
    db: Option<PathBuf>,

    #[arg(value_name = "QUERY")]
    query: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ModeArg {
    Singleton,
    Iterative,
    Batch,
}

impl From<ModeArg> for ExplorationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Singleton => ExplorationMode::Singleton,
            ModeArg::Iterative => ExplorationMode::Iterative,
            ModeArg::Batch => ExplorationMode::Batch,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpanReport {
    query: String,
    entries: Vec<SpanEntryReport>,
    stats: SearchStats,
}

#[derive(Debug, Serialize)]
struct StoredReport {
    query: String,
    hint_sets: Vec<StoredHintSet>,
    dependencies: Vec<StoredDependency>,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when at least one query could not be searched.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = SpanConfig::load(cli.config.as_deref())?;
    telemetry::init(&config.logging.filter);

    match cli.command {
        Command::Span(cmd) => {
            if let Some(threads) = cmd.threads {
                config.explain.threads = threads;
            }
            if let Some(mode) = cmd.mode {
                config.explain.mode = mode.into();
            }
            let database = cmd.db.unwrap_or_else(|| config.storage.database.clone());
            let search = SpanSearch::new(config.search_options()?);
            let factory = FixtureFactory::from_path(&cmd.fixture)?;
            let mut store = SqliteSpanStore::open(&database)?;

            let mut all_ok = true;
            for query in &cmd.queries {
                match run_query_span(&factory, &mut store, query, &search) {
                    Ok(span) => {
                        let report = SpanReport {
                            query: query.display().to_string(),
                            entries: span.report(),
                            stats: span.stats(),
                        };
                        emit(&cli.format, &report, |_| print_span_text(&report))?;
                    }
                    Err(err) => {
                        error!(query = %query.display(), error = %err, "query span failed");
                        eprintln!("error: {}: {err}", query.display());
                        all_ok = false;
                    }
                }
            }
            Ok(all_ok)
        }
        Command::Show(cmd) => {
            let database = cmd.db.unwrap_or_else(|| config.storage.database.clone());
            let store = SqliteSpanStore::open(&database)?;
            let query = cmd.query.to_string_lossy().into_owned();
            let report = StoredReport {
                hint_sets: store.hint_sets(&query)?,
                dependencies: store.dependencies(&query)?,
                query,
            };
            emit(&cli.format, &report, |_| print_stored_text(&report))?;
            Ok(true)
        }
    }
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_span_text(report: &SpanReport) {
    println!("{}:", report.query);
    for entry in &report.entries {
        let label = if entry.key.is_empty() {
            "<default>"
        } else {
            entry.key.as_str()
        };
        let flag = if entry.required { " required" } else { "" };
        let hash = entry
            .plan_hash
            .map(|hash| hash.to_string())
            .unwrap_or_default();
        println!("  {label}{flag} {hash}");
    }
    println!(
        "  rounds={} explains={}",
        report.stats.rounds, report.stats.explains
    );
}

fn print_stored_text(report: &StoredReport) {
    println!("{}:", report.query);
    for hint_set in &report.hint_sets {
        let flag = if hint_set.required { " required" } else { "" };
        println!("  [{}]{flag}", hint_set.key);
    }
    for dependency in &report.dependencies {
        println!("  [{}] -> [{}]", dependency.child, dependency.parent);
    }
}
