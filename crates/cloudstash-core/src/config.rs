//! Configuration module for Cloudstash.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Cloudstash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub remote: RemoteConfig,
    pub state: StateConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

/// What to back up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Backup list: one path per line, relative to `source_root`.
    pub list_file: PathBuf,
    /// Directory every backup-list path is resolved against.
    pub source_root: PathBuf,
}

/// Remote object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Title of the top-level folder that holds the whole backup.
    pub root_name: String,
    /// SQLite database backing the object store.
    pub store_path: PathBuf,
}

/// Local bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding one `<file name>.md5` fingerprint per backed-up file.
    pub hashes_dir: PathBuf,
}

/// Content transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Size of each streamed upload chunk (in KiB).
    pub chunk_size_kb: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file; when unset, logs go to stderr.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/cloudstash/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    /// Platform-appropriate directory holding the configuration, the
    /// backup list and its help file.
    pub fn default_dir() -> PathBuf {
        config_dir()
    }

    /// Upload chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> usize {
        self.transfer.chunk_size_kb * 1024
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("cloudstash")
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("cloudstash")
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or on systems without a home directory,
/// are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

/// Default title of the remote root folder.
pub const DEFAULT_ROOT_NAME: &str = "Android Backup";

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            list_file: config_dir().join("backup"),
            source_root: dirs::home_dir().unwrap_or_else(|| PathBuf::from("~")),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            store_path: data_dir().join("remote.db"),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            hashes_dir: data_dir().join("hashes"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { chunk_size_kb: 8 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"remote.root_name"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest accepted `transfer.chunk_size_kb` (64 MiB).
const MAX_CHUNK_SIZE_KB: usize = 64 * 1024;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- backup ---
        // Check source root only when it does not start with `~` (tilde is expanded at runtime).
        let root_str = self.backup.source_root.to_string_lossy();
        if !root_str.starts_with('~') && !self.backup.source_root.is_dir() {
            errors.push(ValidationError {
                field: "backup.source_root".into(),
                message: format!(
                    "directory does not exist: {}",
                    self.backup.source_root.display()
                ),
            });
        }
        if self.backup.list_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "backup.list_file".into(),
                message: "must not be empty".into(),
            });
        }

        // --- remote ---
        let root_name = self.remote.root_name.trim();
        if root_name.is_empty() {
            errors.push(ValidationError {
                field: "remote.root_name".into(),
                message: "must not be empty".into(),
            });
        } else if root_name.contains('/') {
            errors.push(ValidationError {
                field: "remote.root_name".into(),
                message: format!("must not contain '/': {}", self.remote.root_name),
            });
        }
        if self.remote.store_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "remote.store_path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- state ---
        if self.state.hashes_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "state.hashes_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- transfer ---
        if self.transfer.chunk_size_kb == 0 || self.transfer.chunk_size_kb > MAX_CHUNK_SIZE_KB {
            errors.push(ValidationError {
                field: "transfer.chunk_size_kb".into(),
                message: format!("must be in range 1..={MAX_CHUNK_SIZE_KB}"),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use cloudstash_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .source_root(PathBuf::from("/sdcard"))
///     .remote_root_name("Phone Backup")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- backup ---

    pub fn list_file(mut self, path: PathBuf) -> Self {
        self.config.backup.list_file = path;
        self
    }

    pub fn source_root(mut self, root: PathBuf) -> Self {
        self.config.backup.source_root = root;
        self
    }

    // --- remote ---

    pub fn remote_root_name(mut self, name: impl Into<String>) -> Self {
        self.config.remote.root_name = name.into();
        self
    }

    pub fn store_path(mut self, path: PathBuf) -> Self {
        self.config.remote.store_path = path;
        self
    }

    // --- state ---

    pub fn hashes_dir(mut self, dir: PathBuf) -> Self {
        self.config.state.hashes_dir = dir;
        self
    }

    // --- transfer ---

    pub fn chunk_size_kb(mut self, kb: usize) -> Self {
        self.config.transfer.chunk_size_kb = kb;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn valid_builder(root: &Path) -> ConfigBuilder {
        ConfigBuilder::new().source_root(root.to_path_buf())
    }

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.root_name, "Android Backup");
        assert!(cfg.backup.list_file.ends_with("cloudstash/backup"));
        assert!(cfg.remote.store_path.ends_with("cloudstash/remote.db"));
        assert!(cfg.state.hashes_dir.ends_with("cloudstash/hashes"));
        assert_eq!(cfg.transfer.chunk_size_kb, 8);
        assert_eq!(cfg.chunk_size_bytes(), 8192);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.file.is_none());
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        let errors = cfg.validate();
        // the home directory may not exist on a CI/test machine, filter that out
        let non_root_errors: Vec<_> = errors
            .iter()
            .filter(|e| e.field != "backup.source_root")
            .collect();
        assert!(
            non_root_errors.is_empty(),
            "unexpected validation errors: {non_root_errors:?}"
        );
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
backup:
  list_file: /tmp/cloudstash/backup
  source_root: /sdcard
remote:
  root_name: Phone Backup
  store_path: /tmp/cloudstash/remote.db
state:
  hashes_dir: /tmp/cloudstash/hashes
transfer:
  chunk_size_kb: 64
logging:
  level: debug
  file: /tmp/cloudstash.log
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.backup.list_file, PathBuf::from("/tmp/cloudstash/backup"));
        assert_eq!(cfg.backup.source_root, PathBuf::from("/sdcard"));
        assert_eq!(cfg.remote.root_name, "Phone Backup");
        assert_eq!(cfg.remote.store_path, PathBuf::from("/tmp/cloudstash/remote.db"));
        assert_eq!(cfg.state.hashes_dir, PathBuf::from("/tmp/cloudstash/hashes"));
        assert_eq!(cfg.transfer.chunk_size_kb, 64);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.file, Some(PathBuf::from("/tmp/cloudstash.log")));
    }

    #[test]
    fn load_partial_yaml_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"remote:\n  root_name: Tablet\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.remote.root_name, "Tablet");
        assert!(cfg.remote.store_path.ends_with("remote.db"));
        assert_eq!(cfg.transfer.chunk_size_kb, 8);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.remote.root_name, DEFAULT_ROOT_NAME);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_missing_source_root() {
        let cfg = ConfigBuilder::new()
            .source_root(PathBuf::from("/definitely/not/here"))
            .build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "backup.source_root"));
    }

    #[test]
    fn validate_skips_tilde_source_root() {
        let cfg = ConfigBuilder::new()
            .source_root(PathBuf::from("~/storage"))
            .build();
        assert!(!cfg.validate().iter().any(|e| e.field == "backup.source_root"));
    }

    #[test]
    fn validate_catches_bad_root_name() {
        let dir = tempfile::tempdir().unwrap();

        let cfg = valid_builder(dir.path()).remote_root_name("  ").build();
        assert!(cfg.validate().iter().any(|e| e.field == "remote.root_name"));

        let cfg = valid_builder(dir.path()).remote_root_name("a/b").build();
        assert!(cfg.validate().iter().any(|e| e.field == "remote.root_name"));
    }

    #[test]
    fn validate_catches_chunk_size_out_of_range() {
        let dir = tempfile::tempdir().unwrap();

        let cfg = valid_builder(dir.path()).chunk_size_kb(0).build();
        assert!(cfg.validate().iter().any(|e| e.field == "transfer.chunk_size_kb"));

        let cfg = valid_builder(dir.path())
            .chunk_size_kb(MAX_CHUNK_SIZE_KB + 1)
            .build();
        assert!(cfg.validate().iter().any(|e| e.field == "transfer.chunk_size_kb"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = valid_builder(dir.path()).logging_level("verbose").build();
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "logging.level");
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        let dir = tempfile::tempdir().unwrap();
        for level in VALID_LOG_LEVELS {
            let cfg = valid_builder(dir.path()).logging_level(*level).build();
            assert!(cfg.validate().is_empty(), "level {level} should be valid");
        }
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .list_file(PathBuf::from("/etc/cloudstash/list"))
            .source_root(PathBuf::from("/sdcard"))
            .remote_root_name("Phone Backup")
            .store_path(PathBuf::from("/var/lib/cloudstash/remote.db"))
            .hashes_dir(PathBuf::from("/var/lib/cloudstash/hashes"))
            .chunk_size_kb(32)
            .logging_level("trace")
            .logging_file(PathBuf::from("/var/log/cloudstash.log"))
            .build();

        assert_eq!(cfg.backup.list_file, PathBuf::from("/etc/cloudstash/list"));
        assert_eq!(cfg.backup.source_root, PathBuf::from("/sdcard"));
        assert_eq!(cfg.remote.root_name, "Phone Backup");
        assert_eq!(cfg.remote.store_path, PathBuf::from("/var/lib/cloudstash/remote.db"));
        assert_eq!(cfg.state.hashes_dir, PathBuf::from("/var/lib/cloudstash/hashes"));
        assert_eq!(cfg.chunk_size_bytes(), 32 * 1024);
        assert_eq!(cfg.logging.level, "trace");
        assert_eq!(cfg.logging.file, Some(PathBuf::from("/var/log/cloudstash.log")));
    }

    #[test]
    fn builder_build_validated_succeeds_for_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(valid_builder(dir.path()).build_validated().is_ok());
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = valid_builder(dir.path()).chunk_size_kb(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    // -- Misc --

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("cloudstash/config.yaml"));
    }

    #[test]
    fn expand_home_only_touches_leading_tilde() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_home(Path::new("rel/~x")), PathBuf::from("rel/~x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/Music")), home.join("Music"));
        }
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "remote.root_name".into(),
            message: "must not be empty".into(),
        };
        assert_eq!(err.to_string(), "remote.root_name: must not be empty");
    }
}
