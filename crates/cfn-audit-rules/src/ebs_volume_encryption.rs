//! Rule requiring EBS volumes to be encrypted.
//!
//! # Rationale
//!
//! Unencrypted volumes expose data at rest and every snapshot taken from
//! them. `Encrypted` must be `true`, either literally or through a parameter
//! default.

use cfn_audit_core::{CfnModel, Rule, RuleError, Violation};

use crate::values::is_true;

/// Rule id for EBS volume encryption.
pub const ID: &str = "F1";

/// Flags `AWS::EC2::Volume` resources whose `Encrypted` is not true.
#[derive(Debug, Clone, Copy, Default)]
pub struct EbsVolumeEncryption;

impl EbsVolumeEncryption {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for EbsVolumeEncryption {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "EBS volume should have server-side encryption enabled"
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let offenders = model
            .resources_by_type("AWS::EC2::Volume")
            .filter(|volume| {
                !volume
                    .property("Encrypted")
                    .is_some_and(|v| is_true(model, v))
            })
            .map(|volume| volume.logical_id.as_str());
        Ok(self.violations_for(offenders))
    }
}
