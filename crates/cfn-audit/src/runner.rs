//! Runner for `cargo test` integration.

use cfn_audit_core::{Auditor, Config};
use std::path::{Path, PathBuf};

/// Config file names to search for, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["cfn-audit.toml", ".cfn-audit.toml"];

/// Audits templates under `path` as part of `cargo test`.
///
/// Uses the built-in rules and the `cfn-audit.toml` found at the project
/// root. A relative `path` is resolved against the project root.
///
/// # Panics
///
/// Panics with a formatted report if any failing violation is found, or if
/// the auditor cannot be built.
pub fn check_templates(path: impl AsRef<Path>) {
    run_check(path.as_ref(), None);
}

/// Like [`check_templates`], with an explicit config file.
///
/// # Panics
///
/// Panics with a formatted report if any failing violation is found, or if
/// the config cannot be read.
pub fn check_templates_with_config(path: impl AsRef<Path>, config_path: impl AsRef<Path>) {
    run_check(path.as_ref(), Some(config_path.as_ref()));
}

fn run_check(path: &Path, config_path: Option<&Path>) {
    let root = find_project_root();
    let config = load_config(&root, config_path);

    let catalog = cfn_audit_rules::builtin_catalog()
        .unwrap_or_else(|e| panic!("cfn-audit: failed to build rule catalog: {e}"));

    let auditor = Auditor::builder()
        .catalog(catalog)
        .config(config)
        .build()
        .unwrap_or_else(|e| panic!("cfn-audit: failed to build auditor: {e}"));

    let input = resolve(&root, path);
    let report = auditor
        .audit_aggregate_across_files(&input)
        .unwrap_or_else(|e| panic!("cfn-audit: audit failed: {e}"));

    if report.has_failures() {
        panic!("{}", report.format_test_report());
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Loads the explicit config, else the first candidate at the root, else defaults.
fn load_config(root: &Path, explicit_path: Option<&Path>) -> Config {
    let path = match explicit_path {
        Some(path) => Some(resolve(root, path)),
        None => CONFIG_CANDIDATES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists()),
    };

    match path {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            panic!("cfn-audit: failed to load config from {}: {e}", path.display());
        }),
        None => Config::default(),
    }
}

/// Checks whether a `Cargo.toml` file defines a `[workspace]` section
/// by parsing as TOML, avoiding false positives from comments or strings.
fn has_workspace_section(cargo_toml: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(cargo_toml) else {
        return false;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return false;
    };
    table.contains_key("workspace")
}

/// Finds the project root by walking up from `CARGO_MANIFEST_DIR` to the
/// workspace root.
fn find_project_root() -> PathBuf {
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    };
    let manifest_path = PathBuf::from(manifest_dir);

    manifest_path
        .ancestors()
        .find(|dir| has_workspace_section(&dir.join("Cargo.toml")))
        .map_or_else(|| manifest_path.clone(), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_config(dir.path(), None), Config::default());
    }

    #[test]
    fn load_config_finds_hidden_candidate() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".cfn-audit.toml"),
            "[audit]\noutput_format = \"json\"\n",
        )
        .unwrap();
        assert_eq!(load_config(dir.path(), None).audit.output_format, "json");
    }

    #[test]
    fn load_config_explicit_relative_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("ci")).unwrap();
        std::fs::write(dir.path().join("ci/audit.toml"), "[rules.W2]\nenabled = false\n").unwrap();

        let config = load_config(dir.path(), Some(Path::new("ci/audit.toml")));
        assert_eq!(config.rule_enabled("W2"), Some(false));
    }

    #[test]
    #[should_panic(expected = "failed to load config")]
    fn load_config_explicit_missing_panics() {
        let dir = TempDir::new().unwrap();
        load_config(dir.path(), Some(Path::new("missing.toml")));
    }

    #[test]
    fn has_workspace_section_ignores_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, "# [workspace]\n[package]\nname = \"x\"\n").unwrap();
        assert!(!has_workspace_section(&path));

        std::fs::write(&path, "[workspace]\nmembers = []\n").unwrap();
        assert!(has_workspace_section(&path));
    }

    #[test]
    fn project_root_is_workspace_root() {
        let root = find_project_root();
        assert!(has_workspace_section(&root.join("Cargo.toml")));
    }
}
