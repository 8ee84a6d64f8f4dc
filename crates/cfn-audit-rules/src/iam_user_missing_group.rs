//! Rule requiring IAM users to belong to a group.
//!
//! Permissions should be granted through groups rather than attached to
//! individual users. Membership may be declared on the user (`Groups`) or
//! through an `AWS::IAM::UserToGroupAddition` that references the user.

use std::collections::HashSet;

use cfn_audit_core::{CfnModel, Rule, RuleError, Violation};
use serde_json::Value;

use crate::values::referenced_id;

/// Rule id for group-less IAM users.
pub const ID: &str = "F2000";

/// Flags `AWS::IAM::User` resources that are not in any group.
#[derive(Debug, Clone, Copy, Default)]
pub struct IamUserMissingGroup;

impl IamUserMissingGroup {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for IamUserMissingGroup {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "User is not assigned to a group"
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let added_to_group: HashSet<&str> = model
            .resources_by_type("AWS::IAM::UserToGroupAddition")
            .filter_map(|addition| addition.property("Users"))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(referenced_id)
            .collect();

        let offenders = model
            .resources_by_type("AWS::IAM::User")
            .filter(|user| {
                !user
                    .property("Groups")
                    .and_then(Value::as_array)
                    .is_some_and(|groups| !groups.is_empty())
            })
            .filter(|user| !added_to_group.contains(user.logical_id.as_str()))
            .map(|user| user.logical_id.as_str());

        Ok(self.violations_for(offenders))
    }
}
