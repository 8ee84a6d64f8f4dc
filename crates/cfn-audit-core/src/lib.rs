//! # cfn-audit-core
//!
//! Core framework for auditing CloudFormation templates.
//!
//! This crate provides the foundational traits and types for building
//! template auditors. It includes:
//!
//! - [`CfnParser`] turning JSON or YAML templates into a [`CfnModel`]
//! - [`Rule`] trait for security and best-practice rules
//! - [`RuleCatalog`] for registering and executing rules
//! - [`Profile`] for allow/deny filtering by rule id
//! - [`Auditor`] for orchestrating discovery, auditing, and rendering
//! - [`Violation`] for representing findings
//!
//! ## Example
//!
//! ```ignore
//! use cfn_audit_core::{Auditor, RuleCatalog};
//!
//! let auditor = Auditor::builder()
//!     .catalog(RuleCatalog::with_rules(my_rules())?)
//!     .build()?;
//!
//! let report = auditor.audit_aggregate_across_files("templates".as_ref())?;
//! println!("{} failure(s)", report.failure_count());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auditor;
mod catalog;
mod config;
mod discovery;
mod model;
mod profile;
mod render;
mod rule;
mod types;

/// Declarative rules loaded from TOML rule files.
pub mod declarative;

/// Utility modules for rule implementations.
pub mod utils;

pub use auditor::{AuditError, Auditor, AuditorBuilder};
pub use catalog::{CatalogError, RuleCatalog};
pub use config::{AuditConfig, Config, ConfigError, RuleConfig};
pub use discovery::{DiscoveryError, TemplateDiscovery, DEFAULT_EXTENSIONS};
pub use model::{CfnModel, CfnParser, ParseError, Parameter, Resource};
pub use profile::{Profile, ProfileDefinition, ProfileError, ProfileKind};
pub use render::{
    renderer_for, supported_formats, JsonRenderer, RenderError, Renderer, TextRenderer,
};
pub use rule::{Rule, RuleBox, RuleDefinition, RuleError};
pub use types::{
    AuditReport, FileResults, TemplateResults, Violation, ViolationType, FATAL_RULE_ID,
};
pub use utils::suppression::{check_suppression, SuppressCheck};
