//! Configuration types for cfn-audit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::catalog::RuleCatalog;
use crate::discovery::DEFAULT_EXTENSIONS;

/// Top-level configuration, read from `cfn-audit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Audit run settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Per-rule configurations keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// Relative paths in the file are resolved against its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.audit.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        if config.audit.parallelism == Some(0) {
            return Err(ConfigError::Invalid {
                message: "audit.parallelism must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Returns the explicit enablement for a rule, if configured.
    #[must_use]
    pub fn rule_enabled(&self, rule_id: &str) -> Option<bool> {
        self.rules.get(rule_id).and_then(|c| c.enabled)
    }

    /// Applies per-rule enablement overrides to a catalog.
    pub fn apply_to(&self, catalog: &mut RuleCatalog) {
        for (id, rule) in &self.rules {
            if let Some(enabled) = rule.enabled {
                catalog.set_enabled(id.clone(), enabled);
            }
        }
    }
}

/// Audit run configuration (`[audit]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Default output format key (default: "txt").
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Directory of declarative rule files.
    #[serde(default)]
    pub rule_directory: Option<PathBuf>,

    /// Allow-list profile file.
    #[serde(default)]
    pub profile: Option<PathBuf>,

    /// Deny-list profile file.
    #[serde(default)]
    pub deny_list: Option<PathBuf>,

    /// Glob patterns excluded from discovery.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Template extensions accepted during discovery.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Number of templates audited concurrently (unset: one per core).
    #[serde(default)]
    pub parallelism: Option<usize>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            rule_directory: None,
            profile: None,
            deny_list: None,
            exclude: Vec::new(),
            extensions: default_extensions(),
            parallelism: None,
        }
    }
}

impl AuditConfig {
    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.rule_directory, &mut self.profile, &mut self.deny_list]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn default_output_format() -> String {
    "txt".to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule runs.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(cfn_audit::config::io))]
    Io {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(code(cfn_audit::config::parse))]
    Parse {
        /// Error message.
        message: String,
    },

    /// A value is syntactically valid but not usable.
    #[error("Invalid config: {message}")]
    #[diagnostic(code(cfn_audit::config::invalid))]
    Invalid {
        /// Error message.
        message: String,
    },
}
