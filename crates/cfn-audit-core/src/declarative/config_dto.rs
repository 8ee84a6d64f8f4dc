//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to domain model types via the loader.

use serde::Deserialize;

/// Raw TOML representation of a rule file.
///
/// A file holds any number of `[[require-property]]` and
/// `[[forbid-property]]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclarativeConfigDto {
    /// Property requirement rules.
    #[serde(rename = "require-property", default)]
    pub require_property: Vec<PropertyCheckDto>,

    /// Property prohibition rules.
    #[serde(rename = "forbid-property", default)]
    pub forbid_property: Vec<PropertyCheckDto>,
}

/// TOML representation of a property check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropertyCheckDto {
    /// Rule id (e.g., "C1").
    pub id: String,
    /// Resource type pattern (e.g., "AWS::S3::Bucket").
    pub resource_type: String,
    /// Dot-separated property path.
    pub path: String,
    /// Expected value.
    #[serde(default)]
    pub equals: Option<toml::Value>,
    /// Violation message.
    pub message: String,
    /// Violation type (default: "failing").
    #[serde(rename = "type", default = "default_type_str")]
    pub violation_type: String,
    /// Whether the rule runs by default.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_type_str() -> String {
    "failing".to_string()
}

fn default_true() -> bool {
    true
}
