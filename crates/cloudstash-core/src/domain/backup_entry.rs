//! Backup list entries
//!
//! The backup list is a plain text file with one entry per line. Blank
//! lines and lines whose first non-whitespace character is `#` are
//! ignored; every other line holds exactly one positional token, the path
//! of a file or directory relative to the source root. A token may be
//! wrapped in double quotes to contain spaces.
//!
//! Each line is split into tokens and handed to a clap parser, the same
//! way a command line would be. Lines are parsed lazily so that a
//! malformed line only aborts the run once it is reached, after earlier
//! entries have been processed.

use std::path::{Path, PathBuf};

use clap::builder::NonEmptyStringValueParser;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};

use super::errors::BackupError;

/// One line of the backup list
#[derive(Debug, Parser)]
#[command(
    name = "backup-list",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    override_usage = "<filepath>",
    after_help = "Each non-comment line of the backup list holds exactly one <filepath>.\n\
                  Directories are backed up recursively; files are uploaded again only\n\
                  when their content changes."
)]
pub struct BackupLine {
    /// The relative path to the file/directory
    #[arg(value_name = "filepath", value_parser = NonEmptyStringValueParser::new())]
    pub filepath: String,
}

impl BackupLine {
    /// Help text describing the line syntax
    #[must_use]
    pub fn help_text() -> String {
        Self::command().render_help().to_string()
    }

    fn parse_tokens(tokens: Vec<String>) -> Result<String, String> {
        Self::try_parse_from(tokens)
            .map(|line| line.filepath)
            .map_err(|e| clap_message(&e))
    }
}

/// A single entry of the backup list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    line: usize,
    path: String,
}

impl BackupEntry {
    /// Create an entry for the given 1-based line
    #[must_use]
    pub fn new(line: usize, path: impl Into<String>) -> Self {
        Self {
            line,
            path: path.into(),
        }
    }

    /// 1-based line number the entry was read from
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Path relative to the source root, as written
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolves the entry against the source root
    #[must_use]
    pub fn resolve(&self, source_root: &Path) -> PathBuf {
        source_root.join(self.path.trim_start_matches('/'))
    }

    /// Parses one raw line
    ///
    /// Returns `None` for blank and comment lines.
    ///
    /// # Errors
    /// Returns [`BackupError::ConfigParse`] when the line does not hold
    /// exactly one path token.
    pub fn parse_line(line: usize, raw: &str) -> Option<Result<Self, BackupError>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        Some(
            tokenize(trimmed)
                .and_then(BackupLine::parse_tokens)
                .map(|path| Self::new(line, path))
                .map_err(|message| BackupError::ConfigParse { line, message }),
        )
    }
}

/// Lazily parses every line of a backup list
///
/// Line numbers are counted over the raw text, so skipped lines still
/// advance the counter.
pub fn parse_backup_list(text: &str) -> impl Iterator<Item = Result<BackupEntry, BackupError>> + '_ {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| BackupEntry::parse_line(idx + 1, raw))
}

// First line of clap's rendered error, without the `error: ` prefix.
fn clap_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
