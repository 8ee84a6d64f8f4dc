//! # cfn-audit
//!
//! Security auditor for CloudFormation templates.
//!
//! This is the main facade crate that re-exports the core framework and the
//! built-in rules.
//!
//! ## Quick Start: `cargo test` Integration
//!
//! ```toml
//! [dev-dependencies]
//! cfn-audit = "0.1"
//! ```
//!
//! ```rust,ignore
//! // tests/templates.rs
//! #[test]
//! fn templates_are_secure() {
//!     cfn_audit::check_templates("infra/templates");
//! }
//! ```
//!
//! This audits the templates as part of `cargo test`. Configure via
//! `cfn-audit.toml` at the workspace root.
//!
//! ## Suppressions
//!
//! Exempt one resource from one rule through its metadata:
//!
//! ```yaml
//! Resources:
//!   PublicSite:
//!     Type: AWS::S3::Bucket
//!     Metadata:
//!       cfn_nag:
//!         rules_to_suppress:
//!           - id: W31
//!             reason: static website
//! ```
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use cfn_audit::{rules::builtin_catalog, Auditor};
//!
//! let auditor = Auditor::builder()
//!     .catalog(builtin_catalog()?)
//!     .build()?;
//!
//! let report = auditor.audit_aggregate_across_files("templates".as_ref())?;
//! ```

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use cfn_audit_core::*;

mod runner;

pub use runner::{check_templates, check_templates_with_config};

/// Built-in rules.
pub mod rules {
    pub use cfn_audit_rules::*;
}
