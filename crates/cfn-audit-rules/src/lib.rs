//! # cfn-audit-rules
//!
//! Built-in security rules for cfn-audit.
//!
//! ## Available Rules
//!
//! | Id | Type | Resource | Description |
//! |----|------|----------|-------------|
//! | F1 | failing | `AWS::EC2::Volume` | `Encrypted` must be true |
//! | F14 | failing | `AWS::S3::Bucket` | No `PublicReadWrite` canned ACL |
//! | W31 | warning | `AWS::S3::Bucket` | No `PublicRead` canned ACL |
//! | W2 | warning | `AWS::EC2::SecurityGroup` | No ingress from `0.0.0.0/0` or `::/0` |
//! | F1000 | failing | `AWS::EC2::SecurityGroup` | Egress must be explicit |
//! | F2000 | failing | `AWS::IAM::User` | User must belong to a group |
//! | W10 | warning | `AWS::CloudFront::Distribution` | Access logging enabled |
//!
//! ## Usage
//!
//! ```ignore
//! use cfn_audit_core::Auditor;
//! use cfn_audit_rules::builtin_catalog;
//!
//! let auditor = Auditor::builder()
//!     .catalog(builtin_catalog()?)
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cloudfront_access_logging;
mod ebs_volume_encryption;
mod iam_user_missing_group;
mod presets;
mod s3_bucket_acl;
mod security_group_missing_egress;
mod security_group_open_ingress;
mod values;

pub use cloudfront_access_logging::CloudFrontAccessLogging;
pub use ebs_volume_encryption::EbsVolumeEncryption;
pub use iam_user_missing_group::IamUserMissingGroup;
pub use presets::{builtin_catalog, builtin_rules};
pub use s3_bucket_acl::{S3BucketPublicReadAcl, S3BucketPublicReadWriteAcl};
pub use security_group_missing_egress::SecurityGroupMissingEgress;
pub use security_group_open_ingress::SecurityGroupOpenIngress;

/// Re-export core types for convenience.
pub use cfn_audit_core::{Rule, Violation, ViolationType};
