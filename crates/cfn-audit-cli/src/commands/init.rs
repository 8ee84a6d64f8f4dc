//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;

const CONFIG_FILE: &str = "cfn-audit.toml";

const DEFAULT_CONFIG: &str = r#"# cfn-audit configuration

[audit]
# Output format: "txt" or "json"
output_format = "txt"

# Directory of declarative rule files ([[require-property]] / [[forbid-property]])
# rule_directory = "audit-rules"

# Allow list: only rule ids listed in this file may report
# profile = "profile.txt"

# Deny list: rule ids listed in this file never report
# deny_list = "deny-list.txt"

# Glob patterns to exclude from discovery
exclude = [
    "**/node_modules/**",
    "**/cdk.out/**",
]

# Template extensions to audit
extensions = ["json", "yaml", "yml", "template"]

# Templates audited concurrently (default: one per core)
# parallelism = 4

# Rule overrides
# Each rule can be enabled or disabled by id

# [rules.W2]
# enabled = false
"#;

/// Runs the init command, writing the config into `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {CONFIG_FILE}");
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} to configure rules");
    println!("  2. Run: cfn-audit audit <templates>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_audit_core::Config;
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.audit.output_format, "txt");
        assert_eq!(config.audit.exclude.len(), 2);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "# mine").unwrap();

        let err = run(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            "# mine"
        );
    }

    #[test]
    fn force_overwrites() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "# mine").unwrap();

        run(dir.path(), true).unwrap();
        let written = std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(written, DEFAULT_CONFIG);
    }
}
