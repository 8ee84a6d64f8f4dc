//! Configuration file resolution with global fallback.
//!
//! Resolution order:
//!
//! 1. `--config` flag (or `CFN_AUDIT_CONFIG`)
//! 2. `cfn-audit.toml` or `.cfn-audit.toml` next to the audited templates
//! 3. `$CFN_AUDIT_CONFIG_DIR/config.toml`, else `~/.cfn-audit/config.toml`
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line.
    Explicit(PathBuf),
    /// Found beside the audited templates.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Returns `true` if the config came from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

const PROJECT_CONFIG_NAMES: &[&str] = &["cfn-audit.toml", ".cfn-audit.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Environment variable overriding the global config directory.
const CONFIG_DIR_ENV: &str = "CFN_AUDIT_CONFIG_DIR";

/// Resolves the configuration file path.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

/// Takes `global_dir` as a parameter so tests don't touch the environment.
fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(candidate) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("Found project config: {}", candidate.display());
        return ConfigSource::Project(candidate);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, |candidate| {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        })
}

/// Returns the global config directory: `$CFN_AUDIT_CONFIG_DIR` or `~/.cfn-audit/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".cfn-audit"))
}
