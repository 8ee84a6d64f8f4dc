//! DTO → Domain model conversion with validation.

use crate::types::ViolationType;
use crate::utils::paths::PropertyPath;

use super::config_dto::{DeclarativeConfigDto, PropertyCheckDto};
use super::model::{
    CheckKind, DeclarativeConfig, ModelError, PropertyCheck, ResourceTypePattern, RuleId,
};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g., "require-property[0].id").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// Unknown violation type string.
    #[error("{context}: unknown type `{value}`, expected: failing, warning")]
    UnknownViolationType {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// The `equals` value cannot be represented as JSON.
    #[error("{context}: unsupported `equals` value: {reason}")]
    UnsupportedValue {
        /// Where the error occurred.
        context: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// Cross-check errors from aggregate root construction.
    #[error("rule file validation errors:\n{}", format_errors(.0))]
    CrossRef(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts a `DeclarativeConfigDto` to a validated `DeclarativeConfig`.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: DeclarativeConfigDto) -> Result<DeclarativeConfig, LoadError> {
    let requires = dto
        .require_property
        .into_iter()
        .enumerate()
        .map(|(i, d)| convert_check(d, CheckKind::Require, &format!("require-property[{i}]")));

    let forbids = dto
        .forbid_property
        .into_iter()
        .enumerate()
        .map(|(i, d)| convert_check(d, CheckKind::Forbid, &format!("forbid-property[{i}]")));

    let checks = requires.chain(forbids).collect::<Result<Vec<_>, _>>()?;

    DeclarativeConfig::new(checks).map_err(LoadError::CrossRef)
}

fn convert_check(
    dto: PropertyCheckDto,
    kind: CheckKind,
    ctx: &str,
) -> Result<PropertyCheck, LoadError> {
    let id = RuleId::new(&dto.id).map_err(|e| LoadError::Validation {
        context: format!("{ctx}.id"),
        source: e,
    })?;

    let resource_type =
        ResourceTypePattern::new(&dto.resource_type).map_err(|e| LoadError::Validation {
            context: format!("{ctx}.resource-type"),
            source: e,
        })?;

    let path = PropertyPath::parse(&dto.path).ok_or_else(|| LoadError::Validation {
        context: format!("{ctx}.path"),
        source: ModelError::InvalidPropertyPath {
            path: dto.path.clone(),
        },
    })?;

    let equals = dto
        .equals
        .map(|v| {
            serde_json::to_value(v).map_err(|e| LoadError::UnsupportedValue {
                context: format!("{ctx}.equals"),
                reason: e.to_string(),
            })
        })
        .transpose()?;

    let violation_type = parse_violation_type(&dto.violation_type, &format!("{ctx}.type"))?;

    Ok(PropertyCheck::new(
        id,
        kind,
        resource_type,
        path,
        equals,
        dto.message,
        violation_type,
        dto.enabled,
    ))
}

fn parse_violation_type(value: &str, context: &str) -> Result<ViolationType, LoadError> {
    match value {
        "failing" | "FAILING_VIOLATION" => Ok(ViolationType::FailingViolation),
        "warning" | "WARNING" => Ok(ViolationType::Warning),
        _ => Err(LoadError::UnknownViolationType {
            context: context.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and_load(toml_str: &str) -> Result<DeclarativeConfig, LoadError> {
        let dto: DeclarativeConfigDto = toml::from_str(toml_str).unwrap();
        load(dto)
    }

    // -- Happy path --

    #[test]
    fn load_empty_file() {
        let config = parse_and_load("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn load_full_file() {
        let config = parse_and_load(
            r#"
[[forbid-property]]
id = "C2"
resource-type = "AWS::EC2::*"
path = "PubliclyAccessible"
equals = true
message = "No public endpoints."

[[require-property]]
id = "C1"
resource-type = "AWS::S3::Bucket"
path = "BucketEncryption"
message = "Encrypt buckets."
type = "warning"
"#,
        )
        .unwrap();

        let checks = config.checks();
        assert_eq!(checks.len(), 2);
        // requires are loaded before forbids
        assert_eq!(checks[0].id().as_str(), "C1");
        assert_eq!(checks[0].kind(), CheckKind::Require);
        assert_eq!(checks[0].violation_type(), ViolationType::Warning);
        assert_eq!(checks[1].id().as_str(), "C2");
        assert_eq!(checks[1].equals(), Some(&serde_json::Value::Bool(true)));
    }

    // -- Error cases --

    #[test]
    fn load_rejects_invalid_id() {
        let result = parse_and_load(
            r#"
[[require-property]]
id = "FATAL"
resource-type = "AWS::S3::Bucket"
path = "A"
message = "m"
"#,
        );
        match result {
            Err(LoadError::Validation { context, source }) => {
                assert_eq!(context, "require-property[0].id");
                assert_eq!(source, ModelError::ReservedRuleId);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_rejects_bad_resource_type() {
        let result = parse_and_load(
            r#"
[[forbid-property]]
id = "C1"
resource-type = "Bucket"
path = "A"
message = "m"
"#,
        );
        assert!(matches!(result, Err(LoadError::Validation { context, .. }) if context == "forbid-property[0].resource-type"));
    }

    #[test]
    fn load_rejects_bad_path() {
        let result = parse_and_load(
            r#"
[[require-property]]
id = "C1"
resource-type = "AWS::S3::Bucket"
path = "A..B"
message = "m"
"#,
        );
        assert!(matches!(result, Err(LoadError::Validation { .. })));
    }

    #[test]
    fn load_rejects_unknown_type() {
        let result = parse_and_load(
            r#"
[[require-property]]
id = "C1"
resource-type = "AWS::S3::Bucket"
path = "A"
message = "m"
type = "critical"
"#,
        );
        assert!(matches!(result, Err(LoadError::UnknownViolationType { .. })));
    }

    #[test]
    fn load_rejects_duplicate_ids_across_tables() {
        let result = parse_and_load(
            r#"
[[require-property]]
id = "C1"
resource-type = "AWS::S3::Bucket"
path = "A"
message = "m"

[[forbid-property]]
id = "C1"
resource-type = "AWS::S3::Bucket"
path = "B"
message = "m"
"#,
        );
        assert!(matches!(result, Err(LoadError::CrossRef(errors)) if errors.len() == 1));
    }
}
