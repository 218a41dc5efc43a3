// crates/pocopi-cli/src/main.rs
// ============================================================================
// Module: PoCoPI CLI Entry Point
// Description: Command dispatcher for serving and checking PoCoPI studies.
// Purpose: Run the backend and validate configurations before deployment.
// Dependencies: clap, pocopi-config, pocopi-core, pocopi-server, tokio
// ============================================================================

//! ## Overview
//! `pocopi serve` starts the backend. `pocopi config validate` checks the
//! server configuration and the test configuration it references, `pocopi
//! config schema` prints the test configuration JSON schema, and `pocopi
//! sample` draws groups repeatedly so researchers can confirm declared
//! proportions before running a study.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use pocopi_config::PocopiConfig;
use pocopi_config::load_test_config;
use pocopi_config::test_config_schema;
use pocopi_core::Config;
use pocopi_server::PocopiServer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;

use crate::logging::init_logging;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of draws accepted by `pocopi sample`.
const MAX_TRIALS: u32 = 10_000_000;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "pocopi", version, about = "PoCoPI psychometric test backend")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the PoCoPI HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Draw groups repeatedly and report observed proportions.
    Sample(SampleCommand),
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Server configuration path (defaults to `POCOPI_CONFIG` or `pocopi.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the server configuration and its test configuration.
    Validate(ConfigValidateCommand),
    /// Print the test configuration JSON schema.
    Schema,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Server configuration path (defaults to `POCOPI_CONFIG` or `pocopi.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Test configuration path overriding `test.path`.
    #[arg(long, value_name = "PATH")]
    test: Option<PathBuf>,
}

/// Arguments for `sample`.
#[derive(Args, Debug)]
struct SampleCommand {
    /// Test configuration path.
    #[arg(long, value_name = "PATH")]
    test: PathBuf,
    /// Number of draws.
    #[arg(long, default_value_t = 10_000)]
    trials: u32,
    /// Seed for reproducible draws; the OS generator is used when absent.
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Config {
            command: ConfigCommand::Schema,
        } => command_config_schema(),
        Commands::Sample(command) => command_sample(&command),
    }
}

// ============================================================================
// SECTION: Serve
// ============================================================================

/// Starts the server and runs until it fails.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = PocopiConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    if config.server.allow_non_loopback {
        tracing::warn!(bind = %config.server.bind, "serving beyond loopback without authentication");
    }

    let server = tokio::task::spawn_blocking(move || PocopiServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Validates the server configuration and the referenced test configuration.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = PocopiConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("server config invalid: {err}")))?;
    let test_path = command.test.clone().unwrap_or_else(|| PathBuf::from(&config.test.path));
    let study = load_study(&test_path)?;
    write_stdout_line(&format!(
        "config valid: {} groups, {} protocols, {} questions ({})",
        study.groups().count(),
        study.protocols().count(),
        study.protocols().map(|protocol| protocol.question_count()).sum::<usize>(),
        test_path.display()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the test configuration schema.
fn command_config_schema() -> CliResult<ExitCode> {
    write_json(&test_config_schema())?;
    Ok(ExitCode::SUCCESS)
}

/// Loads a test configuration with a path-qualified error.
fn load_study(path: &Path) -> CliResult<Config> {
    load_test_config(path)
        .map_err(|err| CliError::new(format!("test config {} invalid: {err}", path.display())))
}

// ============================================================================
// SECTION: Sample
// ============================================================================

/// Observed draws for one group.
#[derive(Debug, Serialize)]
struct GroupDraws {
    /// Declared weight normalized over all groups.
    expected: f64,
    /// Observed share of draws.
    observed: f64,
    /// Number of draws.
    count: u32,
}

/// Sampling report printed by `pocopi sample`.
#[derive(Debug, Serialize)]
struct SampleReport {
    /// Number of draws.
    trials: u32,
    /// Per-group results keyed by label.
    groups: BTreeMap<String, GroupDraws>,
}

/// Draws groups repeatedly and prints observed proportions.
fn command_sample(command: &SampleCommand) -> CliResult<ExitCode> {
    if command.trials == 0 || command.trials > MAX_TRIALS {
        return Err(CliError::new(format!("--trials must be between 1 and {MAX_TRIALS}")));
    }
    let study = load_study(&command.test)?;
    let mut counts: BTreeMap<String, u32> =
        study.groups().map(|group| (group.label().to_string(), 0)).collect();
    let mut rng = match command.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for _ in 0 .. command.trials {
        let label = study.sample_group_with(&mut rng).label().to_string();
        *counts.entry(label).or_default() += 1;
    }

    let total_weight: f64 = study.groups().map(pocopi_core::Group::probability).sum();
    let groups = study
        .groups()
        .map(|group| {
            let count = counts.get(group.label().as_str()).copied().unwrap_or_default();
            (group.label().to_string(), GroupDraws {
                expected: group.probability() / total_weight,
                observed: f64::from(count) / f64::from(command.trials),
                count,
            })
        })
        .collect();
    write_json(&SampleReport {
        trials: command.trials,
        groups,
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&text)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
