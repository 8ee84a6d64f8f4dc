//! The built-in rule set.

use cfn_audit_core::{CatalogError, RuleBox, RuleCatalog};

use crate::{
    CloudFrontAccessLogging, EbsVolumeEncryption, IamUserMissingGroup, S3BucketPublicReadAcl,
    S3BucketPublicReadWriteAcl, SecurityGroupMissingEgress, SecurityGroupOpenIngress,
};

/// Returns every built-in rule, in registration order.
#[must_use]
pub fn builtin_rules() -> Vec<RuleBox> {
    vec![
        Box::new(EbsVolumeEncryption::new()),
        Box::new(S3BucketPublicReadWriteAcl::new()),
        Box::new(S3BucketPublicReadAcl::new()),
        Box::new(SecurityGroupOpenIngress::new()),
        Box::new(SecurityGroupMissingEgress::new()),
        Box::new(IamUserMissingGroup::new()),
        Box::new(CloudFrontAccessLogging::new()),
    ]
}

/// Returns a catalog holding the built-in rules.
///
/// # Errors
///
/// Returns an error if two built-in rules share an id.
pub fn builtin_catalog() -> Result<RuleCatalog, CatalogError> {
    RuleCatalog::with_rules(builtin_rules())
}
