//! Rule requiring access logging on CloudFront distributions.

use cfn_audit_core::utils::PropertyPath;
use cfn_audit_core::{CfnModel, Rule, RuleError, Violation, ViolationType};

/// Rule id for CloudFront access logging.
pub const ID: &str = "W10";

/// Flags distributions without `DistributionConfig.Logging`.
#[derive(Debug, Clone)]
pub struct CloudFrontAccessLogging {
    logging: PropertyPath,
}

impl Default for CloudFrontAccessLogging {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudFrontAccessLogging {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            logging: PropertyPath::from_segments(["DistributionConfig", "Logging"]),
        }
    }
}

impl Rule for CloudFrontAccessLogging {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "CloudFront Distribution should enable access logging"
    }

    fn violation_type(&self) -> ViolationType {
        ViolationType::Warning
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        let offenders = model
            .resources_by_type("AWS::CloudFront::Distribution")
            .filter(|dist| dist.property_at(&self.logging).is_none())
            .map(|dist| dist.logical_id.as_str());
        Ok(self.violations_for(offenders))
    }
}
