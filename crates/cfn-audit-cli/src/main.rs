//! cfn-audit CLI tool.
//!
//! Usage:
//! ```bash
//! cfn-audit audit [OPTIONS] [PATH]
//! cfn-audit list-rules
//! cfn-audit init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Security auditor for CloudFormation templates
#[derive(Parser)]
#[command(name = "cfn-audit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CFN_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit templates; exits with the number of failing violations (capped
    /// at 254), or 255 if the audit could not run
    Audit(commands::audit::AuditArgs),

    /// List available rules
    ListRules {
        /// Directory of declarative rule files to include
        #[arg(long)]
        rule_directory: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "txt")]
        format: ListFormat,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for `list-rules`.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ListFormat {
    /// Aligned table.
    #[default]
    Txt,
    /// JSON array of rule definitions.
    Json,
}

/// Exit status for runs that fail before producing a report.
const ERROR_EXIT_STATUS: i32 = 255;

/// Largest exit status used for a failure count.
const MAX_FAILURE_STATUS: usize = 254;

fn main() {
    let cli = Cli::parse();
    let dispatch = log_dispatch(cli.debug);

    let status = match tracing::dispatcher::with_default(&dispatch, || run(cli, &dispatch)) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ERROR_EXIT_STATUS
        }
    };
    if status != 0 {
        std::process::exit(status);
    }
}

/// Builds the stderr log dispatcher; `RUST_LOG` wins over `--debug`.
fn log_dispatch(debug: bool) -> Dispatch {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    Dispatch::new(subscriber)
}

fn run(cli: Cli, dispatch: &Dispatch) -> Result<i32> {
    match cli.command {
        Commands::Audit(args) => {
            let total = commands::audit::run(args, cli.config.as_deref(), dispatch)?;
            Ok(exit_status(total))
        }
        Commands::ListRules {
            rule_directory,
            format,
        } => {
            let source = config_resolver::resolve(Path::new("."), cli.config.as_deref());
            commands::list_rules::run(rule_directory.as_deref(), format, &source)?;
            Ok(0)
        }
        Commands::Init { force } => {
            commands::init::run(Path::new("."), force)?;
            Ok(0)
        }
    }
}

/// Maps a failure count to a process exit status, below the error status.
fn exit_status(failures: usize) -> i32 {
    i32::try_from(failures.min(MAX_FAILURE_STATUS)).unwrap_or(ERROR_EXIT_STATUS - 1)
}
