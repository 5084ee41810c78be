//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use bookscan_core::catalog::parse_endpoint;
use bookscan_core::{ApplicationId, Config};

use crate::output::{Output, OutputFormat};

/// Show current configuration
///
/// The application ID is never printed in full.
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let application_id = config
        .catalog
        .application_id()
        .ok()
        .map(|id| id.to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "application_id": application_id,
                    "endpoint": config.catalog.endpoint,
                    "arm_timeout_ms": config.scan.arm_timeout_ms,
                    "cool_down_ms": config.scan.cool_down_ms,
                    "frame_height": config.scan.frame_height,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.catalog.endpoint);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!(
                "  application_id: {}",
                application_id.as_deref().unwrap_or("(not set)")
            );
            println!("  endpoint:       {}", config.catalog.endpoint);
            println!("  arm_timeout_ms: {}", config.scan.arm_timeout_ms);
            println!("  cool_down_ms:   {}", config.scan.cool_down_ms);
            println!(
                "  frame_height:   {}",
                config
                    .scan
                    .frame_height
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  log_file:       {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    // Edit the file itself; BOOKSCAN_* overrides must not be written back
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let mut config =
        Config::read_from_path(&save_path).context("Failed to load configuration")?;
    let mut shown = value.clone();

    match key.as_str() {
        "application_id" => {
            if is_unset(&value) {
                config.catalog.application_id = None;
            } else {
                let id = ApplicationId::new(value.clone())?;
                shown = id.to_string();
                config.catalog.application_id = Some(value.trim().to_string());
            }
        }
        "endpoint" => {
            let endpoint = value.trim();
            // Reject anything the catalog client would refuse later
            parse_endpoint(endpoint)?;
            config.catalog.endpoint = endpoint.to_string();
        }
        "arm_timeout_ms" => {
            config.scan.arm_timeout_ms = value
                .parse()
                .context("Invalid value for arm_timeout_ms. Use a number of milliseconds.")?;
        }
        "cool_down_ms" => {
            config.scan.cool_down_ms = value
                .parse()
                .context("Invalid value for cool_down_ms. Use a number of milliseconds.")?;
        }
        "frame_height" => {
            config.scan.frame_height = if is_unset(&value) {
                None
            } else {
                Some(
                    value
                        .parse()
                        .context("Invalid value for frame_height. Use a height in pixels.")?,
                )
            };
        }
        "log_file" => {
            config.log_file = if is_unset(&value) {
                None
            } else {
                Some(value.clone().into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: application_id, endpoint, arm_timeout_ms, cool_down_ms, frame_height, log_file",
                key
            );
        }
    }

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn is_unset(value: &str) -> bool {
    value.is_empty() || value == "none"
}
