//! Rule trait for defining audit rules.

use serde::Serialize;

use crate::model::CfnModel;
use crate::types::{Violation, ViolationType};

/// Error raised by a rule that could not complete its evaluation.
///
/// The catalog converts it into a failing violation for that rule instead of
/// aborting the audit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RuleError {
    message: String,
}

impl RuleError {
    /// Creates a new rule error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Static description of a rule, used for listing and profile resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDefinition {
    /// Rule id (e.g., "F1").
    pub id: String,
    /// What the rule reports.
    pub description: String,
    /// Kind of the violations it produces.
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    /// Whether the rule runs unless configured otherwise.
    pub enabled_by_default: bool,
}

/// An audit rule evaluated against a parsed template.
///
/// Implement this trait to create rules that inspect resources of a template
/// and report the ones that do not comply.
///
/// # Example
///
/// ```ignore
/// use cfn_audit_core::{CfnModel, Rule, RuleError, Violation, ViolationType};
///
/// pub struct TopicMustBeEncrypted;
///
/// impl Rule for TopicMustBeEncrypted {
///     fn id(&self) -> &str { "F18" }
///     fn description(&self) -> &str { "SNS topic should specify KmsMasterKeyId" }
///
///     fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
///         let offenders: Vec<&str> = model
///             .resources_by_type("AWS::SNS::Topic")
///             .filter(|r| r.property("KmsMasterKeyId").is_none())
///             .map(|r| r.logical_id.as_str())
///             .collect();
///         Ok(self.violations_for(offenders))
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the rule id (e.g., "W2").
    fn id(&self) -> &str;

    /// Returns a brief description of what this rule reports.
    fn description(&self) -> &str;

    /// Returns the kind of violations this rule produces.
    fn violation_type(&self) -> ViolationType {
        ViolationType::FailingViolation
    }

    /// Whether this rule runs when the configuration does not mention it.
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Evaluates the template and returns any violations found.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the rule cannot evaluate this template.
    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError>;

    /// Builds this rule's definition.
    fn definition(&self) -> RuleDefinition {
        RuleDefinition {
            id: self.id().to_string(),
            description: self.description().to_string(),
            violation_type: self.violation_type(),
            enabled_by_default: self.enabled_by_default(),
        }
    }

    /// Wraps offending logical ids into this rule's violation.
    ///
    /// Returns an empty vector when there are no offenders.
    fn violations_for<I, S>(&self, logical_ids: I) -> Vec<Violation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        Self: Sized,
    {
        let ids: Vec<String> = logical_ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Vec::new();
        }
        vec![
            Violation::new(self.id(), self.violation_type(), self.description())
                .with_logical_resource_ids(ids),
        ]
    }
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRule;

    impl Rule for TestRule {
        fn id(&self) -> &str {
            "T1"
        }
        fn description(&self) -> &str {
            "A test rule"
        }
        fn violation_type(&self) -> ViolationType {
            ViolationType::Warning
        }

        fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
            Ok(self.violations_for(model.resources().map(|r| r.logical_id.clone())))
        }
    }

    #[test]
    fn test_rule_definition() {
        let def = TestRule.definition();
        assert_eq!(def.id, "T1");
        assert_eq!(def.description, "A test rule");
        assert_eq!(def.violation_type, ViolationType::Warning);
        assert!(def.enabled_by_default);
    }

    #[test]
    fn test_violations_for_empty_is_empty() {
        assert!(TestRule.violations_for(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_violations_for_collects_ids() {
        let violations = TestRule.violations_for(["A", "B"]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].id(), "T1");
        assert_eq!(violations[0].violation_type(), ViolationType::Warning);
        assert_eq!(violations[0].logical_resource_ids(), ["A", "B"]);
    }
}
