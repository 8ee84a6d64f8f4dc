//! Audit command implementation.

use anyhow::{Context, Result};
use cfn_audit_core::{Auditor, Config};
use cfn_audit_rules::builtin_catalog;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Dispatch;

use crate::config_resolver;

/// Arguments of the audit command.
#[derive(Debug, clap::Args)]
pub struct AuditArgs {
    /// Template file or directory to audit
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format (txt, json); defaults to the configured format
    #[arg(short, long)]
    pub format: Option<String>,

    /// Allow-list profile: only these rule ids may report
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Deny-list profile: these rule ids never report
    #[arg(long)]
    pub deny_list: Option<PathBuf>,

    /// Directory of declarative rule files
    #[arg(long)]
    pub rule_directory: Option<PathBuf>,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,
}

impl AuditArgs {
    /// Overrides config values with the flags that were given.
    fn apply_to(&self, config: &mut Config) {
        if let Some(format) = &self.format {
            config.audit.output_format.clone_from(format);
        }
        if let Some(profile) = &self.profile {
            config.audit.profile = Some(profile.clone());
        }
        if let Some(deny_list) = &self.deny_list {
            config.audit.deny_list = Some(deny_list.clone());
        }
        if let Some(dir) = &self.rule_directory {
            config.audit.rule_directory = Some(dir.clone());
        }
        config.audit.exclude.extend(self.exclude.iter().cloned());
    }
}

/// Runs the audit command and returns the total failure count.
pub fn run(args: AuditArgs, config_path: Option<&Path>, dispatch: &Dispatch) -> Result<usize> {
    let project_dir = if args.path.is_dir() {
        args.path.as_path()
    } else {
        args.path.parent().unwrap_or(Path::new("."))
    };
    let source = config_resolver::resolve(project_dir, config_path);
    let mut config = super::load_config(&source)?;
    args.apply_to(&mut config);

    let format = config.audit.output_format.clone();
    let auditor = Auditor::builder()
        .catalog(builtin_catalog().context("Failed to register built-in rules")?)
        .config(config)
        .dispatch(dispatch.clone())
        .build()
        .context("Failed to build auditor")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let total = auditor
        .audit_aggregate_across_files_and_render(&args.path, &format, &mut out)
        .with_context(|| format!("Audit of {} failed", args.path.display()))?;
    out.flush()?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AuditArgs,
    }

    #[test]
    fn flags_override_config() {
        let wrapper = Wrapper::try_parse_from([
            "audit",
            "--format",
            "json",
            "--profile",
            "allow.txt",
            "--exclude",
            "cdk.out/**",
        ])
        .unwrap();

        let mut config =
            Config::parse("[audit]\noutput_format = \"txt\"\nexclude = [\"vendor/**\"]\n").unwrap();
        wrapper.args.apply_to(&mut config);

        assert_eq!(config.audit.output_format, "json");
        assert_eq!(config.audit.profile, Some(PathBuf::from("allow.txt")));
        assert_eq!(config.audit.exclude, vec!["vendor/**", "cdk.out/**"]);
    }

    #[test]
    fn absent_flags_keep_config() {
        let wrapper = Wrapper::try_parse_from(["audit"]).unwrap();
        let mut config = Config::parse("[audit]\noutput_format = \"json\"\n").unwrap();
        wrapper.args.apply_to(&mut config);
        assert_eq!(config.audit.output_format, "json");
    }
}
