//! bookscan CLI
//!
//! Command-line interface for bookscan - ISBN validation, catalog lookup and
//! barcode scan sessions.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookscan_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Log level used when BOOKSCAN_LOG is not set
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(name = "bookscan")]
#[command(about = "bookscan - Scan book barcodes and look up ISBNs")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a book by ISBN
    Lookup {
        /// ISBN-13, hyphens and spaces allowed
        isbn: String,
    },
    /// Check whether values are usable ISBN-13s
    Validate {
        /// Values to check
        #[arg(required = true)]
        isbn: Vec<String>,
    },
    /// Run a scan session fed by JSON-lines decode events
    Scan {
        /// Read events from FILE instead of stdin
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Start disarmed; wait for an {"command":"arm"} line
        #[arg(long)]
        no_arm: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (application_id, endpoint, arm_timeout_ms, cool_down_ms, frame_height, log_file)
        key: String,
        /// Value to set
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even when the file is unusable
    let command = match cli.command {
        Commands::Config { command } => {
            return handle_config_command(command, config_path, &output)
        }
        command => command,
    };

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    match command {
        Commands::Lookup { isbn } => commands::lookup::lookup(&config, &isbn, &output).await,
        Commands::Validate { isbn } => commands::validate::validate(&isbn, &output),
        Commands::Scan { input, no_arm } => {
            commands::scan::scan(&config, input, !no_arm, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
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

/// Install the tracing subscriber
///
/// Level comes from BOOKSCAN_LOG; output goes to `log_file` when configured,
/// stderr otherwise.
fn init_logging(config: &Config) {
    let log_level = std::env::var("BOOKSCAN_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
    let env_filter = EnvFilter::new(format!(
        "bookscan_core={},bookscan_cli={}",
        log_level, log_level
    ));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match File::options().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
