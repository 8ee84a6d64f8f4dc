//! Tests for `cargo test` integration over template directories.

use std::path::PathBuf;

use cfn_audit::Rule;

fn fixtures(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn clean_templates_pass() {
    cfn_audit::check_templates(fixtures("clean"));
}

#[test]
#[should_panic(expected = "cfn-audit: 1 failing violation(s)")]
fn insecure_templates_panic_with_report() {
    cfn_audit::check_templates(fixtures("insecure"));
}

#[test]
#[should_panic(expected = "audit failed")]
fn missing_directory_panics() {
    cfn_audit::check_templates(fixtures("does-not-exist"));
}

#[test]
fn facade_exposes_rules_and_auditor() {
    let auditor = cfn_audit::Auditor::builder()
        .catalog(cfn_audit::rules::builtin_catalog().unwrap())
        .build()
        .unwrap();
    let results = auditor.audit("Resources:\n  V:\n    Type: AWS::EC2::Volume\n");
    assert_eq!(results.failure_count(), 1);
    assert_eq!(
        results.violations()[0].id(),
        cfn_audit::rules::EbsVolumeEncryption::new().id()
    );
}
