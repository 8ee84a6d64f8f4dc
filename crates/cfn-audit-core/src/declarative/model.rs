//! Pure domain model for declarative template rules.
//!
//! This module contains no serde and no I/O.
//! All invariants are enforced at construction time via validated newtypes.

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::types::{ViolationType, FATAL_RULE_ID};
use crate::utils::paths::PropertyPath;

// ────────────────────────────────────────────
// Newtypes with validation
// ────────────────────────────────────────────

/// A validated rule id (non-empty, no whitespace, not `FATAL`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new rule id.
    ///
    /// # Errors
    ///
    /// Returns error if the id is empty, contains whitespace, or is reserved.
    pub fn new(id: &str) -> Result<Self, ModelError> {
        if id.is_empty() {
            return Err(ModelError::EmptyRuleId);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ModelError::InvalidRuleId { id: id.to_string() });
        }
        if id == FATAL_RULE_ID {
            return Err(ModelError::ReservedRuleId);
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated resource type pattern such as `AWS::S3::Bucket` or `AWS::EC2::*`.
///
/// The glob is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypePattern {
    raw: String,
    compiled: glob::Pattern,
}

impl ResourceTypePattern {
    /// Creates a new resource type pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern has no `::` separator or invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, ModelError> {
        let segments: Vec<&str> = pattern.split("::").collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(ModelError::InvalidResourceType {
                pattern: pattern.to_string(),
                reason: "expected `Provider::Service::Resource`".to_string(),
            });
        }
        let compiled =
            glob::Pattern::new(pattern).map_err(|e| ModelError::InvalidResourceType {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a resource type matches this pattern.
    #[must_use]
    pub fn matches(&self, resource_type: &str) -> bool {
        self.compiled.matches(resource_type)
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

// ────────────────────────────────────────────
// Domain entities
// ────────────────────────────────────────────

/// What a property check asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// The property must exist (and equal the expected value, if any).
    Require,
    /// The property must not exist (or must not equal the expected value).
    Forbid,
}

/// A declarative property check bound to a resource type.
#[derive(Debug, Clone)]
pub struct PropertyCheck {
    id: RuleId,
    kind: CheckKind,
    resource_type: ResourceTypePattern,
    path: PropertyPath,
    equals: Option<Value>,
    message: String,
    violation_type: ViolationType,
    enabled: bool,
}

impl PropertyCheck {
    /// Creates a new property check.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: RuleId,
        kind: CheckKind,
        resource_type: ResourceTypePattern,
        path: PropertyPath,
        equals: Option<Value>,
        message: String,
        violation_type: ViolationType,
        enabled: bool,
    ) -> Self {
        Self {
            id,
            kind,
            resource_type,
            path,
            equals,
            message,
            violation_type,
            enabled,
        }
    }

    /// Returns the rule id.
    #[must_use]
    pub fn id(&self) -> &RuleId {
        &self.id
    }

    /// Returns the check kind.
    #[must_use]
    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    /// Returns the resource type pattern.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceTypePattern {
        &self.resource_type
    }

    /// Returns the property path.
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Returns the expected value, if any.
    #[must_use]
    pub fn equals(&self) -> Option<&Value> {
        self.equals.as_ref()
    }

    /// Returns the violation message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the violation type.
    #[must_use]
    pub fn violation_type(&self) -> ViolationType {
        self.violation_type
    }

    /// Returns whether the rule is enabled by default.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Tests whether a resource's properties violate this check.
    #[must_use]
    pub fn is_violated_by(&self, properties: &Value) -> bool {
        let found = self.path.lookup_all(properties);
        match (self.kind, &self.equals) {
            (CheckKind::Require, None) => found.is_empty(),
            (CheckKind::Require, Some(expected)) => {
                found.is_empty() || found.iter().any(|v| !values_match(v, expected))
            }
            (CheckKind::Forbid, None) => !found.is_empty(),
            (CheckKind::Forbid, Some(expected)) => found.iter().any(|v| values_match(v, expected)),
        }
    }
}

/// Compares a template value to an expected value.
///
/// Templates commonly spell booleans and numbers as strings (`"true"`), so a
/// string is also accepted when it renders the same as a scalar expectation.
fn values_match(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::String(s), Value::Bool(_) | Value::Number(_)) => {
            s.eq_ignore_ascii_case(&expected.to_string())
        }
        _ => false,
    }
}

// ────────────────────────────────────────────
// Aggregate root
// ────────────────────────────────────────────

/// The validated set of checks declared by one rule file.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeConfig {
    checks: Vec<PropertyCheck>,
}

impl DeclarativeConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns every duplicate rule id found.
    pub fn new(checks: Vec<PropertyCheck>) -> Result<Self, Vec<ModelError>> {
        let mut seen = HashSet::new();
        let errors: Vec<ModelError> = checks
            .iter()
            .filter(|c| !seen.insert(c.id().as_str().to_string()))
            .map(|c| ModelError::DuplicateRuleId {
                id: c.id().clone(),
            })
            .collect();

        if errors.is_empty() {
            Ok(Self { checks })
        } else {
            Err(errors)
        }
    }

    /// Returns true if no checks are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Returns all checks in declaration order.
    #[must_use]
    pub fn checks(&self) -> &[PropertyCheck] {
        &self.checks
    }

    /// Consumes the configuration, returning its checks.
    #[must_use]
    pub fn into_checks(self) -> Vec<PropertyCheck> {
        self.checks
    }
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Validation errors for domain model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Rule id is empty.
    #[error("rule id must not be empty")]
    EmptyRuleId,

    /// Rule id contains whitespace.
    #[error("invalid rule id `{id}`: must not contain whitespace")]
    InvalidRuleId {
        /// The invalid id.
        id: String,
    },

    /// Rule id is the reserved parse-failure id.
    #[error("rule id `FATAL` is reserved")]
    ReservedRuleId,

    /// Resource type pattern is malformed.
    #[error("invalid resource type `{pattern}`: {reason}")]
    InvalidResourceType {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Property path is empty or has an empty segment.
    #[error("invalid property path `{path}`")]
    InvalidPropertyPath {
        /// The invalid path.
        path: String,
    },

    /// Two checks in the same file share an id.
    #[error("duplicate rule id `{id}`")]
    DuplicateRuleId {
        /// The repeated id.
        id: RuleId,
    },
}

// ────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────
