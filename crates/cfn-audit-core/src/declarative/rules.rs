//! Declarative rule implementations.
//!
//! Converts validated [`PropertyCheck`]s into [`Rule`] trait implementations
//! that inspect resource properties.

use crate::declarative::model::{CheckKind, PropertyCheck};
use crate::model::CfnModel;
use crate::rule::{Rule, RuleError};
use crate::types::{Violation, ViolationType};

/// A rule backed by one `[[require-property]]` or `[[forbid-property]]` table.
#[derive(Debug, Clone)]
pub struct PropertyCheckRule {
    check: PropertyCheck,
}

impl PropertyCheckRule {
    /// Creates a rule from a validated check.
    #[must_use]
    pub fn new(check: PropertyCheck) -> Self {
        Self { check }
    }
}

impl Rule for PropertyCheckRule {
    fn id(&self) -> &str {
        self.check.id().as_str()
    }

    fn description(&self) -> &str {
        self.check.message()
    }

    fn violation_type(&self) -> ViolationType {
        self.check.violation_type()
    }

    fn enabled_by_default(&self) -> bool {
        self.check.enabled()
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let offenders: Vec<&str> = model
            .resources()
            .filter(|r| self.check.resource_type().matches(&r.resource_type))
            .filter(|r| self.check.is_violated_by(&r.properties))
            .map(|r| r.logical_id.as_str())
            .collect();

        if !offenders.is_empty() {
            tracing::trace!(
                "{} check {} matched {} resource(s)",
                match self.check.kind() {
                    CheckKind::Require => "require-property",
                    CheckKind::Forbid => "forbid-property",
                },
                self.id(),
                offenders.len()
            );
        }

        Ok(self.violations_for(offenders))
    }
}
