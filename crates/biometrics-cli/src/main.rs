//! Biometrics CLI
//!
//! Command-line interface for logging body weight and water intake.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use biometrics_core::{Config, StorageError, Store, WeightUnit};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable that turns logging on and sets its level
const LOG_ENV: &str = "BIOMETRICS_LOG";

#[derive(Parser)]
#[command(name = "biometrics")]
#[command(about = "Biometrics - weight and water log bucketed by local day")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and inspect body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Record and inspect water intake
    Water {
        #[command(subcommand)]
        command: WaterCommands,
    },
    /// Daily water totals and weights over a trailing window
    Chart {
        /// Number of days, ending today (clamped to 1..=366)
        #[arg(short, long, default_value_t = 90)]
        days: u32,
        /// Weight unit for the series (defaults to display_unit)
        #[arg(short, long)]
        unit: Option<WeightUnit>,
    },
    /// Show a local day's UTC bounds and totals
    Day {
        /// Calendar day, YYYY-MM-DD
        day: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show database location, event counts and today's summary
    Status,
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Record a measurement for now
    #[command(alias = "add")]
    Set {
        /// Measured weight (must be > 0)
        value: f64,
        /// Unit of the measurement (defaults to display_unit)
        #[arg(short, long)]
        unit: Option<WeightUnit>,
    },
    /// Show today's latest weight
    Today,
    /// List the most recent measurements
    #[command(alias = "ls")]
    Recent {
        #[arg(short, long, default_value_t = 14)]
        limit: usize,
    },
    /// Delete the most recent measurement
    Undo,
    /// Delete a measurement by id
    #[command(alias = "delete")]
    Rm { id: i64 },
}

#[derive(Subcommand)]
enum WaterCommands {
    /// Record intake in liters (negative to correct)
    Add {
        /// Signed delta in liters, non-zero and within [-10, 10]
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Show today's total
    Today,
    /// List the most recent water events
    #[command(alias = "ls")]
    Recent {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete the most recent water event
    Undo,
    /// Delete a water event by id
    #[command(alias = "delete")]
    Rm { id: i64 },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, timezone, display_unit, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = recovery_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let store = Store::open_with_config(config)?;

    match cli.command {
        Commands::Weight { command } => handle_weight_command(command, &store, output),
        Commands::Water { command } => handle_water_command(command, &store, output),
        Commands::Chart { days, unit } => commands::chart::show(&store, days, unit, output),
        Commands::Day { day } => commands::day::show(&store, &day, output),
        Commands::Status => commands::status::show(&store, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_weight_command(command: WeightCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        WeightCommands::Set { value, unit } => commands::weight::set(store, value, unit, output),
        WeightCommands::Today => commands::weight::today(store, output),
        WeightCommands::Recent { limit } => commands::weight::recent(store, limit, output),
        WeightCommands::Undo => commands::weight::undo(store, output),
        WeightCommands::Rm { id } => commands::weight::remove(store, id, output),
    }
}

fn handle_water_command(command: WaterCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        WaterCommands::Add { delta } => commands::water::add(store, delta, output),
        WaterCommands::Today => commands::water::today(store, output),
        WaterCommands::Recent { limit } => commands::water::recent(store, limit, output),
        WaterCommands::Undo => commands::water::undo(store, output),
        WaterCommands::Rm { id } => commands::water::remove(store, id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// 2 for bad input, 1 for everything else
fn exit_status(error: &anyhow::Error) -> u8 {
    let client_error = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<biometrics_core::Error>())
        .any(|e| e.is_client_error());

    if client_error {
        2
    } else {
        1
    }
}

/// Recovery suggestion of the first storage error in the chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        let storage = cause.downcast_ref::<StorageError>().or_else(|| {
            match cause.downcast_ref::<biometrics_core::Error>() {
                Some(biometrics_core::Error::Storage(inner)) => Some(inner),
                _ => None,
            }
        })?;
        storage.recovery_suggestion()
    })
}

/// Initialize logging
///
/// Only initializes if BIOMETRICS_LOG is set. Logs go to `log_file` when
/// configured, otherwise stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "biometrics_core={},biometrics_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            // Ignore error if already initialized
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            info!("Logging to {:?}", path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
