//! List rules command implementation.

use anyhow::{Context, Result};
use cfn_audit_core::{Config, RuleDefinition, ViolationType};
use cfn_audit_rules::builtin_catalog;
use serde::Serialize;
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::ListFormat;

/// One row of the listing.
#[derive(Debug, Serialize)]
struct RuleRow {
    id: String,
    #[serde(rename = "type")]
    violation_type: ViolationType,
    enabled: bool,
    description: String,
}

impl RuleRow {
    fn new(definition: RuleDefinition, config: &Config) -> Self {
        Self {
            enabled: config
                .rule_enabled(&definition.id)
                .unwrap_or(definition.enabled_by_default),
            id: definition.id,
            violation_type: definition.violation_type,
            description: definition.description,
        }
    }
}

/// Runs the list-rules command.
pub fn run(rule_directory: Option<&Path>, format: ListFormat, source: &ConfigSource) -> Result<()> {
    let config = super::load_config(source)?;
    let rows = collect_rows(rule_directory, &config)?;

    match format {
        ListFormat::Txt => print_table(&rows),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

fn collect_rows(rule_directory: Option<&Path>, config: &Config) -> Result<Vec<RuleRow>> {
    let mut catalog = builtin_catalog().context("Failed to register built-in rules")?;

    let directory = rule_directory.or(config.audit.rule_directory.as_deref());
    if let Some(dir) = directory {
        catalog
            .load_rule_directory(dir)
            .with_context(|| format!("Failed to load rules from {}", dir.display()))?;
    }

    Ok(catalog
        .rule_definitions()
        .into_iter()
        .map(|def| RuleRow::new(def, config))
        .collect())
}

fn print_table(rows: &[RuleRow]) {
    println!("{:<8} {:<18} {:<8} Description", "Id", "Type", "Enabled");
    println!("{}", "-".repeat(80));

    for row in rows {
        println!(
            "{:<8} {:<18} {:<8} {}",
            row.id,
            row.violation_type.to_string(),
            if row.enabled { "yes" } else { "no" },
            row.description
        );
    }

    println!("\n{} rule(s)", rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_rows_reflect_config() {
        let config = Config::parse("[rules.W2]\nenabled = false\n").unwrap();
        let rows = collect_rows(None, &config).unwrap();

        assert_eq!(rows.len(), 7);
        let w2 = rows.iter().find(|r| r.id == "W2").unwrap();
        assert!(!w2.enabled);
        assert_eq!(w2.violation_type, ViolationType::Warning);
        assert!(rows.iter().filter(|r| r.id != "W2").all(|r| r.enabled));
    }

    #[test]
    fn custom_rules_are_listed_after_builtins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("custom.toml"),
            r#"
[[require-property]]
id = "C1"
resource-type = "AWS::SQS::Queue"
path = "KmsMasterKeyId"
message = "queues should be encrypted"
enabled = false
"#,
        )
        .unwrap();

        let rows = collect_rows(Some(dir.path()), &Config::default()).unwrap();
        let last = rows.last().unwrap();
        assert_eq!(last.id, "C1");
        assert!(!last.enabled);
    }

    #[test]
    fn rows_serialize_with_type_key() {
        let rows = collect_rows(None, &Config::default()).unwrap();
        let value = serde_json::to_value(&rows).unwrap();
        assert_eq!(value[0]["id"], "F1");
        assert_eq!(value[0]["type"], "FAILING_VIOLATION");
    }
}
