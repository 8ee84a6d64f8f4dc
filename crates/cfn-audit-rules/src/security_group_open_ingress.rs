//! Rule against security group ingress open to the world.
//!
//! Checks inline `SecurityGroupIngress` entries of `AWS::EC2::SecurityGroup`
//! and standalone `AWS::EC2::SecurityGroupIngress` resources.

use cfn_audit_core::{CfnModel, Rule, RuleError, Violation, ViolationType};
use serde_json::Value;

use crate::values::{as_str, one_or_many};

/// Rule id for world-open ingress.
pub const ID: &str = "W2";

const OPEN_IPV4: &str = "0.0.0.0/0";
const OPEN_IPV6: &str = "::/0";

/// Flags security groups with ingress from `0.0.0.0/0` or `::/0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGroupOpenIngress;

impl SecurityGroupOpenIngress {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn is_open_to_world(model: &CfnModel, rule: &Value) -> bool {
    let cidr_is = |key: &str, open: &str| {
        rule.get(key)
            .and_then(|v| as_str(model, v))
            .is_some_and(|cidr| cidr.trim() == open)
    };
    cidr_is("CidrIp", OPEN_IPV4) || cidr_is("CidrIpv6", OPEN_IPV6)
}

impl Rule for SecurityGroupOpenIngress {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Security Groups found with cidr open to world on ingress"
    }

    fn violation_type(&self) -> ViolationType {
        ViolationType::Warning
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let inline = model
            .resources_by_type("AWS::EC2::SecurityGroup")
            .filter(|group| {
                one_or_many(group.property("SecurityGroupIngress"))
                    .any(|rule| is_open_to_world(model, rule))
            });

        let standalone = model
            .resources_by_type("AWS::EC2::SecurityGroupIngress")
            .filter(|ingress| is_open_to_world(model, &ingress.properties));

        let mut offenders: Vec<&str> = inline
            .chain(standalone)
            .map(|r| r.logical_id.as_str())
            .collect();
        offenders.sort_unstable();

        Ok(self.violations_for(offenders))
    }
}
