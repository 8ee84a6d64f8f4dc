//! Rules against public canned ACLs on S3 buckets.

use cfn_audit_core::{CfnModel, Rule, RuleError, Violation, ViolationType};

use crate::values::as_str;

/// Rule id for public read-write bucket ACLs.
pub const PUBLIC_READ_WRITE_ID: &str = "F14";

/// Rule id for public read bucket ACLs.
pub const PUBLIC_READ_ID: &str = "W31";

fn buckets_with_acl<'a>(model: &'a CfnModel, acl: &'a str) -> impl Iterator<Item = &'a str> {
    model
        .resources_by_type("AWS::S3::Bucket")
        .filter(move |bucket| {
            bucket
                .property("AccessControl")
                .and_then(|v| as_str(model, v))
                == Some(acl)
        })
        .map(|bucket| bucket.logical_id.as_str())
}

/// Flags buckets whose `AccessControl` is `PublicReadWrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3BucketPublicReadWriteAcl;

impl S3BucketPublicReadWriteAcl {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for S3BucketPublicReadWriteAcl {
    fn id(&self) -> &str {
        PUBLIC_READ_WRITE_ID
    }

    fn description(&self) -> &str {
        "S3 Bucket should not have a public read-write acl"
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        Ok(self.violations_for(buckets_with_acl(model, "PublicReadWrite")))
    }
}

/// Flags buckets whose `AccessControl` is `PublicRead`.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3BucketPublicReadAcl;

impl S3BucketPublicReadAcl {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for S3BucketPublicReadAcl {
    fn id(&self) -> &str {
        PUBLIC_READ_ID
    }

    fn description(&self) -> &str {
        "S3 Bucket likely should not have a public read acl"
    }

    fn violation_type(&self) -> ViolationType {
        ViolationType::Warning
    }

    fn evaluate(&self, model: &CfnModel) -> Result<Vec<Violation>, RuleError> {
        Ok(self.violations_for(buckets_with_acl(model, "PublicRead")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_audit_core::CfnParser;

    const TEMPLATE: &str = r"
Parameters:
  SiteAcl:
    Type: String
    Default: PublicRead
Resources:
  Uploads:
    Type: AWS::S3::Bucket
    Properties:
      AccessControl: PublicReadWrite
  Site:
    Type: AWS::S3::Bucket
    Properties:
      AccessControl: !Ref SiteAcl
  Logs:
    Type: AWS::S3::Bucket
    Properties:
      AccessControl: LogDeliveryWrite
  Plain:
    Type: AWS::S3::Bucket
";

    #[test]
    fn test_public_read_write() {
        let model = CfnParser::new().parse(TEMPLATE).unwrap();
        let violations = S3BucketPublicReadWriteAcl.evaluate(&model).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_failing());
        assert_eq!(violations[0].logical_resource_ids(), ["Uploads"]);
    }

    #[test]
    fn test_public_read() {
        let model = CfnParser::new().parse(TEMPLATE).unwrap();
        let violations = S3BucketPublicReadAcl.evaluate(&model).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(!violations[0].is_failing());
        assert_eq!(violations[0].logical_resource_ids(), ["Site"]);
    }

    #[test]
    fn test_private_buckets_pass() {
        let model = CfnParser::new()
            .parse("Resources:\n  B:\n    Type: AWS::S3::Bucket\n    Properties:\n      AccessControl: Private\n")
            .unwrap();
        assert!(S3BucketPublicReadWriteAcl.evaluate(&model).unwrap().is_empty());
        assert!(S3BucketPublicReadAcl.evaluate(&model).unwrap().is_empty());
    }
}
