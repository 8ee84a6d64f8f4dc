//! Declarative property rules driven by TOML rule files.
//!
//! Custom rules can be added without writing Rust by dropping `*.toml`
//! files into a rule directory.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! config_dto types
//!   ↓ validate + convert
//! DeclarativeConfig (pure domain model)
//!   ↓ load_rules_from_toml()
//! Vec<RuleBox>
//! ```
//!
//! # Format
//!
//! ```toml
//! [[require-property]]
//! id = "C1"
//! resource-type = "AWS::S3::Bucket"
//! path = "VersioningConfiguration.Status"
//! equals = "Enabled"
//! message = "S3 buckets should enable versioning"
//! type = "warning"
//!
//! [[forbid-property]]
//! id = "C2"
//! resource-type = "AWS::RDS::DBInstance"
//! path = "PubliclyAccessible"
//! equals = true
//! message = "RDS instances should not be publicly accessible"
//! ```

pub mod config_dto;
pub mod loader;
pub mod model;
pub mod rules;

/// Errors from parsing TOML and loading declarative rules.
#[derive(Debug, thiserror::Error)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Domain model validation failed.
    #[error("{0}")]
    Load(#[from] loader::LoadError),
}

/// Parses TOML content and creates one rule per declared check.
///
/// Requires come before forbids; within each table, declaration order is kept.
///
/// # Errors
///
/// Returns an error if TOML parsing or model validation fails.
pub fn load_rules_from_toml(content: &str) -> Result<Vec<crate::rule::RuleBox>, LoadRulesError> {
    let dto: config_dto::DeclarativeConfigDto = toml::from_str(content)?;
    let config = loader::load(dto)?;
    Ok(create_rules(config))
}

/// Creates rules from a validated [`model::DeclarativeConfig`].
#[must_use]
pub fn create_rules(config: model::DeclarativeConfig) -> Vec<crate::rule::RuleBox> {
    config
        .into_checks()
        .into_iter()
        .map(|check| Box::new(rules::PropertyCheckRule::new(check)) as crate::rule::RuleBox)
        .collect()
}
