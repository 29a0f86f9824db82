//! peergrade - peer evaluation grading CLI
//!
//! ## Commands
//!
//! - `import`: store an evaluation snapshot (allocations + scores)
//! - `dashboard`: per-student averages, indices and suggested grades
//! - `flags`: students that need a teacher's attention
//! - `preview`: grade preview rows
//! - `publish`: merge overrides and commit the final grade batch
//! - `grades`: show the published grades of an evaluation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use peergrade_core::report;
use peergrade_core::{
    compute_evaluation, dashboard_csv, flags_csv, EvaluationResult, EvaluationSnapshot,
    GradeOverride, GradePublisher, GradingConfig, PeerGradeError, PublishRequest, UserId,
};
use peergrade_state::{EvaluationSource, GradeLedger, SurrealGradebook};

const DEFAULT_DB_URL: &str = "surrealkv://.peergrade/db";

#[derive(Parser)]
#[command(name = "peergrade")]
#[command(version = peergrade_core::VERSION)]
#[command(about = "Peer/self evaluation grading", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Database URL (mem://, surrealkv://path, ws://host:port)
    #[arg(long, global = true, env = "PEERGRADE_DB_URL", default_value = DEFAULT_DB_URL)]
    db: String,

    /// Grading configuration file (TOML)
    #[arg(long, global = true, env = "PEERGRADE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store an evaluation snapshot (JSON)
    Import {
        /// Path to the snapshot file
        snapshot: PathBuf,
    },

    /// Show the dashboard rows of an evaluation
    Dashboard {
        evaluation_id: i64,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show flagged students
    Flags {
        evaluation_id: i64,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show the grade preview
    Preview { evaluation_id: i64 },

    /// Publish final grades
    Publish {
        evaluation_id: i64,

        /// JSON object mapping user id to `{ "grade": .., "reason": .. }`
        #[arg(short, long)]
        overrides: Option<PathBuf>,

        /// Print the grade list without writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show published grades
    Grades { evaluation_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    peergrade_core::telemetry::init_tracing(cli.json_logs, level);

    let config = load_config(cli.config.as_deref())?;
    let gradebook = SurrealGradebook::connect(&cli.db)
        .await
        .with_context(|| format!("Failed to connect to database {}", cli.db))?;

    let outcome = match cli.command {
        Commands::Import { snapshot } => cmd_import(&gradebook, &config, &snapshot).await,
        Commands::Dashboard {
            evaluation_id,
            format,
        } => cmd_dashboard(&gradebook, &config, evaluation_id, format).await,
        Commands::Flags {
            evaluation_id,
            format,
        } => cmd_flags(&gradebook, &config, evaluation_id, format).await,
        Commands::Preview { evaluation_id } => {
            cmd_preview(&gradebook, &config, evaluation_id).await
        }
        Commands::Publish {
            evaluation_id,
            overrides,
            dry_run,
        } => {
            cmd_publish(
                gradebook,
                config,
                evaluation_id,
                overrides.as_deref(),
                dry_run,
            )
            .await
        }
        Commands::Grades { evaluation_id } => cmd_grades(&gradebook, evaluation_id).await,
    };

    peergrade_core::metrics::METRICS.flush();
    outcome.map(|out| print!("{out}"))
}

fn load_config(path: Option<&Path>) -> Result<GradingConfig> {
    match path {
        Some(path) => GradingConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(GradingConfig::default()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).context("serialize output")?;
    out.push('\n');
    Ok(out)
}

async fn evaluate(
    source: &dyn EvaluationSource,
    config: &GradingConfig,
    evaluation_id: i64,
) -> Result<EvaluationResult> {
    let snapshot = source
        .load_snapshot(evaluation_id)
        .await
        .with_context(|| format!("Failed to load evaluation {evaluation_id}"))?;
    compute_evaluation(&snapshot, config)
        .with_context(|| format!("Evaluation {evaluation_id} could not be graded"))
}

/// Validate a snapshot file and store it.
async fn cmd_import(
    source: &dyn EvaluationSource,
    config: &GradingConfig,
    path: &Path,
) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: EvaluationSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid snapshot", path.display()))?;

    let result = compute_evaluation(&snapshot, config).context("Snapshot rejected")?;
    source
        .store_snapshot(&snapshot)
        .await
        .context("Failed to store snapshot")?;

    info!(
        evaluation_id = snapshot.evaluation_id,
        students = result.results.len(),
        "snapshot imported"
    );
    Ok(format!(
        "Imported evaluation {} ({} students, {} allocations)\n",
        snapshot.evaluation_id,
        snapshot.students.len(),
        snapshot.allocations.len()
    ))
}

async fn cmd_dashboard(
    source: &dyn EvaluationSource,
    config: &GradingConfig,
    evaluation_id: i64,
    format: OutputFormat,
) -> Result<String> {
    let result = evaluate(source, config, evaluation_id).await?;
    let response = report::dashboard(&result);
    match format {
        OutputFormat::Json => to_json(&response),
        OutputFormat::Csv => Ok(dashboard_csv(&response)),
    }
}

async fn cmd_flags(
    source: &dyn EvaluationSource,
    config: &GradingConfig,
    evaluation_id: i64,
    format: OutputFormat,
) -> Result<String> {
    let result = evaluate(source, config, evaluation_id).await?;
    let response = report::flags(&result);
    match format {
        OutputFormat::Json => to_json(&response),
        OutputFormat::Csv => Ok(flags_csv(&response)),
    }
}

async fn cmd_preview(
    source: &dyn EvaluationSource,
    config: &GradingConfig,
    evaluation_id: i64,
) -> Result<String> {
    let result = evaluate(source, config, evaluation_id).await?;
    to_json(&report::grade_preview(&result))
}

fn read_overrides(path: &Path) -> Result<BTreeMap<UserId, GradeOverride>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid override map", path.display()))
}

/// Merge overrides and commit (or, with `dry_run`, only plan) the batch.
/// A rejected batch prints every issue before failing.
async fn cmd_publish(
    gradebook: SurrealGradebook,
    config: GradingConfig,
    evaluation_id: i64,
    overrides: Option<&Path>,
    dry_run: bool,
) -> Result<String> {
    let result = evaluate(&gradebook, &config, evaluation_id).await?;
    let request = PublishRequest {
        evaluation_id,
        overrides: match overrides {
            Some(path) => read_overrides(path)?,
            None => BTreeMap::new(),
        },
    };

    let publisher = GradePublisher::new(gradebook, config);
    let outcome = if dry_run {
        publisher.preview(&result, &request).and_then(|grades| {
            serde_json::to_string_pretty(&grades).map_err(PeerGradeError::from)
        })
    } else {
        match publisher.publish(&result, &request).await {
            Ok(receipt) => serde_json::to_string_pretty(&receipt).map_err(PeerGradeError::from),
            Err(err) => Err(err),
        }
    };

    match outcome {
        Ok(mut out) => {
            out.push('\n');
            Ok(out)
        }
        Err(PeerGradeError::PublishRejected { issues, .. }) => {
            for issue in &issues {
                eprintln!("  - {issue}");
            }
            anyhow::bail!(
                "Publish rejected for evaluation {evaluation_id}: {} issue(s)",
                issues.len()
            )
        }
        Err(err) => Err(err).context("Publish failed"),
    }
}

async fn cmd_grades(ledger: &dyn GradeLedger, evaluation_id: i64) -> Result<String> {
    let grades = ledger
        .grades(evaluation_id)
        .await
        .with_context(|| format!("Failed to read grades for evaluation {evaluation_id}"))?;
    if grades.is_empty() {
        return Ok(format!("No published grades for evaluation {evaluation_id}\n"));
    }
    to_json(&grades)
}
