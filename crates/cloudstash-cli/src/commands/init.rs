//! Init command - first-run setup
//!
//! Creates, when missing:
//! 1. The configuration file with default values
//! 2. The backup list with a commented header
//! 3. A `help` file next to the backup list describing its syntax
//!
//! Existing files are never overwritten.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cloudstash_core::config::{expand_home, Config};
use cloudstash_core::domain::BackupLine;

use super::CommandContext;

const BACKUP_LIST_HEADER: &str = "\
# Cloudstash backup list
#
# One file or directory per line, relative to the source root.
# Blank lines and lines starting with '#' are ignored.
# Wrap paths containing spaces in double quotes.
#
# Examples:
#   Documents
#   Photos/2024
#   \"My Music\"
";

/// Create the configuration, backup list and help file
#[derive(Debug, Args)]
pub struct InitCommand {}

/// Which files `ensure_files` created
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
}

impl InitCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        let report = ensure_files(ctx.config_path(), &config)?;
        info!(created = report.created.len(), "Setup complete");

        if ctx.format.is_json() {
            let json = serde_json::json!({
                "created": report.created.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                "existing": report.existing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
        } else {
            for path in &report.created {
                formatter.success(&format!("Created {}", path.display()));
            }
            for path in &report.existing {
                formatter.info(&format!("Already exists: {}", path.display()));
            }
            let list = expand_home(&config.backup.list_file);
            formatter.info(&format!("Edit {} to choose what to back up", list.display()));
        }
        Ok(())
    }
}

/// Creates every missing setup file
pub fn ensure_files(config_path: &Path, config: &Config) -> Result<InitReport> {
    let mut report = InitReport::default();

    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    write_if_missing(config_path, &yaml, &mut report)?;

    let list = expand_home(&config.backup.list_file);
    write_if_missing(&list, BACKUP_LIST_HEADER, &mut report)?;

    let help = list
        .parent()
        .map(|dir| dir.join("help"))
        .unwrap_or_else(|| PathBuf::from("help"));
    write_if_missing(&help, &BackupLine::help_text(), &mut report)?;

    Ok(report)
}

fn write_if_missing(path: &Path, content: &str, report: &mut InitReport) -> Result<()> {
    if path.exists() {
        report.existing.push(path.to_path_buf());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    report.created.push(path.to_path_buf());
    Ok(())
}

#[cfg(test)]
mod tests {
    use cloudstash_core::config::ConfigBuilder;
    use cloudstash_core::domain::parse_backup_list;
    use tempfile::TempDir;

    use super::*;

    fn config_in(dir: &Path) -> Config {
        ConfigBuilder::new()
            .list_file(dir.join("lists").join("backup"))
            .source_root(dir.to_path_buf())
            .build()
    }

    #[test]
    fn test_creates_all_files() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config = config_in(dir.path());

        let report = ensure_files(&config_path, &config).unwrap();

        assert_eq!(report.created.len(), 3);
        assert!(report.existing.is_empty());
        let help = std::fs::read_to_string(dir.path().join("lists").join("help")).unwrap();
        assert!(help.contains("<filepath>"));

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded.backup.list_file, config.backup.list_file);
    }

    #[test]
    fn test_generated_list_has_no_entries() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        ensure_files(&dir.path().join("config.yaml"), &config).unwrap();

        let text = std::fs::read_to_string(&config.backup.list_file).unwrap();
        assert_eq!(parse_backup_list(&text).count(), 0);
    }

    #[test]
    fn test_existing_files_are_kept() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config = config_in(dir.path());
        std::fs::create_dir_all(dir.path().join("lists")).unwrap();
        std::fs::write(&config.backup.list_file, "Documents\n").unwrap();

        let report = ensure_files(&config_path, &config).unwrap();

        assert_eq!(report.existing, vec![config.backup.list_file.clone()]);
        assert_eq!(
            std::fs::read_to_string(&config.backup.list_file).unwrap(),
            "Documents\n"
        );

        let again = ensure_files(&config_path, &config).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.existing.len(), 3);
    }
}
