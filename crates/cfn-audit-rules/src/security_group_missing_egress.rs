//! Rule requiring security groups to declare egress explicitly.
//!
//! Without `SecurityGroupEgress`, a group allows all outbound traffic. Egress
//! declared through a standalone `AWS::EC2::SecurityGroupEgress` resource
//! that references the group also satisfies the rule.

use std::collections::HashSet;

use cfn_audit_core::{CfnModel, Rule, RuleError, Violation};

use crate::values::referenced_id;

/// Rule id for missing egress rules.
pub const ID: &str = "F1000";

/// Flags `AWS::EC2::SecurityGroup` resources with no egress rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGroupMissingEgress;

impl SecurityGroupMissingEgress {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for SecurityGroupMissingEgress {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Missing egress rule means all traffic is allowed outbound. Make this explicit if it is desired configuration"
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let externally_wired: HashSet<&str> = model
            .resources_by_type("AWS::EC2::SecurityGroupEgress")
            .filter_map(|egress| egress.property("GroupId"))
            .filter_map(referenced_id)
            .collect();

        let offenders = model
            .resources_by_type("AWS::EC2::SecurityGroup")
            .filter(|group| group.property("SecurityGroupEgress").is_none())
            .filter(|group| !externally_wired.contains(group.logical_id.as_str()))
            .map(|group| group.logical_id.as_str());

        Ok(self.violations_for(offenders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_audit_core::CfnParser;

    #[test]
    fn test_missing_egress() {
        let model = CfnParser::new()
            .parse(
                r"
Resources:
  Bare:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: bare
  Inline:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: inline
      SecurityGroupEgress:
        - IpProtocol: tcp
          FromPort: 443
          ToPort: 443
          CidrIp: 10.0.0.0/8
  Wired:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: wired
  WiredEgress:
    Type: AWS::EC2::SecurityGroupEgress
    Properties:
      GroupId: !GetAtt Wired.GroupId
      IpProtocol: '-1'
      CidrIp: 10.0.0.0/8
",
            )
            .unwrap();

        let violations = SecurityGroupMissingEgress.evaluate(&model).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_failing());
        assert_eq!(violations[0].logical_resource_ids(), ["Bare"]);
    }
}
