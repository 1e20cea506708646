use std::path::PathBuf;

use clap::{Parser, Subcommand};
use health_cli::cli::commands::{self, Period};
use health_cli::cli::OutputFormat;
use health_cli::config::{MatchMode, PipelineConfig, TimestampPolicy};
use health_cli::error::format_user_error;

#[derive(Parser)]
#[command(name = "health")]
#[command(author, version, about = "Analyze an Apple Health export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Apple Health export.xml
    #[arg(short, long, global = true, env = "HEALTH_EXPORT")]
    input: Option<PathBuf>,

    /// DuckDB database file
    #[arg(long, global = true, env = "HEALTH_DB")]
    db: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the export into the database, or reuse stored tables
    Load {
        /// Drop stored tables and parse the export again
        #[arg(long)]
        force_refresh: bool,
    },
    /// Show stored tables and row counts
    Status,
    /// Show metric tables or their daily/monthly sums
    Metrics {
        /// Metric to show (e.g. StepCount); all metrics when omitted
        #[arg(short, long)]
        metric: Option<String>,
        /// raw, daily or monthly
        #[arg(short, long, value_enum, default_value = "raw")]
        period: Period,
        /// Match record types exactly instead of by substring
        #[arg(long)]
        exact: bool,
        /// Skip records with malformed timestamps instead of failing
        #[arg(long)]
        skip_bad_timestamps: bool,
    },
    /// Record count per type found in the export
    Types,
    /// Total duration per workout type
    Workouts,
    /// Active energy burned per day
    Activities,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PipelineConfig::default();
    if let Some(input) = cli.input {
        config.input_path = input;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let result = match cli.command {
        Commands::Load { force_refresh } => {
            commands::load(&config.with_force_refresh(force_refresh), cli.format)
        }
        Commands::Status => commands::status(&config, cli.format),
        Commands::Metrics {
            metric,
            period,
            exact,
            skip_bad_timestamps,
        } => {
            if exact {
                config = config.with_match_mode(MatchMode::Exact);
            }
            if skip_bad_timestamps {
                config = config.with_timestamp_policy(TimestampPolicy::SkipAndCount);
            }
            commands::show_metrics(&config, cli.format, metric.as_deref(), period)
        }
        Commands::Types => commands::list_types(&config, cli.format),
        Commands::Workouts => commands::workout_totals(&config, cli.format),
        Commands::Activities => commands::list_activities(&config, cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", format_user_error(&e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let log_env = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("log filter: {}", log_env);
}
