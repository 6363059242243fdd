//! Config command - View and validate Cloudstash configuration
//!
//! Provides the `cloudstash config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Prints the configuration file location

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use cloudstash_core::config::Config;

use super::CommandContext;
use crate::output::plural;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
            ConfigCommand::Path => execute_path(ctx),
        }
    }
}

fn execute_show(ctx: &CommandContext) -> Result<()> {
    let formatter = ctx.formatter();
    let config = ctx.load_config()?;

    if ctx.format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path().display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_validate(ctx: &CommandContext) -> Result<()> {
    let formatter = ctx.formatter();
    let config_path = ctx.config_path();

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            let message = if config_path.exists() {
                format!("Failed to parse configuration: {:#}", e)
            } else {
                "Configuration file not found. Run 'cloudstash init' to create one.".to_string()
            };
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [message],
                }));
            } else {
                formatter.error(&message);
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if ctx.format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            plural(errors.len() as u64)
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}

fn execute_path(ctx: &CommandContext) -> Result<()> {
    if ctx.format.is_json() {
        ctx.formatter().print_json(&serde_json::json!({
            "config_path": ctx.config_path().display().to_string(),
            "exists": ctx.config_path().exists(),
        }));
    } else {
        println!("{}", ctx.config_path().display());
    }
    Ok(())
}
