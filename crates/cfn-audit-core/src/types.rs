//! Core types for audit violations and results.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Rule id used for violations that stand in for an unparseable template.
pub const FATAL_RULE_ID: &str = "FATAL";

/// Kind of a violation.
///
/// Only [`ViolationType::FailingViolation`] counts toward the failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Finding that should be addressed but does not fail the audit.
    Warning,
    /// Finding that fails the audit.
    FailingViolation,
}

impl ViolationType {
    /// Returns true if violations of this type count as failures.
    #[must_use]
    pub fn is_failing(self) -> bool {
        self == Self::FailingViolation
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::FailingViolation => write!(f, "FAILING_VIOLATION"),
        }
    }
}

/// A single finding produced by a rule against a parsed template.
///
/// Violations are immutable once built: fields are only readable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    id: String,
    #[serde(rename = "type")]
    violation_type: ViolationType,
    message: String,
    #[serde(default)]
    logical_resource_ids: Vec<String>,
}

impl Violation {
    /// Creates a new violation with no offending resources.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        violation_type: ViolationType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            violation_type,
            message: message.into(),
            logical_resource_ids: Vec::new(),
        }
    }

    /// Creates the `FATAL` violation reported for a template that could not be
    /// parsed or read.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FATAL_RULE_ID, ViolationType::FailingViolation, message)
    }

    /// Attaches the logical ids of the resources that triggered this violation.
    #[must_use]
    pub fn with_logical_resource_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logical_resource_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Rule id that produced this violation.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind of this violation.
    #[must_use]
    pub fn violation_type(&self) -> ViolationType {
        self.violation_type
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Logical ids of the offending resources.
    #[must_use]
    pub fn logical_resource_ids(&self) -> &[String] {
        &self.logical_resource_ids
    }

    /// Returns true if this violation counts toward the failure count.
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.violation_type.is_failing()
    }

    /// Returns true if this is the synthetic parse-failure violation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.id == FATAL_RULE_ID
    }

    /// Counts the failing violations in a slice.
    #[must_use]
    pub fn count_failures(violations: &[Self]) -> usize {
        violations.iter().filter(|v| v.is_failing()).count()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.violation_type, self.id, self.message)?;
        if !self.logical_resource_ids.is_empty() {
            write!(f, " ({})", self.logical_resource_ids.join(", "))?;
        }
        Ok(())
    }
}

/// Audit outcome for one template.
///
/// `failure_count` is derived from `violations` at construction and the two
/// cannot drift apart afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileResults {
    failure_count: usize,
    violations: Vec<Violation>,
}

impl FileResults {
    /// Creates results from the violations that survived filtering.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            failure_count: Violation::count_failures(&violations),
            violations,
        }
    }

    /// Number of failing violations.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.violations.len() - self.failure_count
    }

    /// All violations, in rule invocation order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

/// Audit outcome for one discovered template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateResults {
    /// Path of the audited template.
    pub filename: PathBuf,
    /// Violations and failure count.
    pub file_results: FileResults,
}

impl TemplateResults {
    /// Creates a new per-template result.
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>, file_results: FileResults) -> Self {
        Self {
            filename: filename.into(),
            file_results,
        }
    }

    /// Path of the audited template.
    #[must_use]
    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

/// Ordered collection of per-template results for one audit run.
///
/// Order is template discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuditReport {
    results: Vec<TemplateResults>,
}

impl AuditReport {
    /// Creates a report from per-template results, keeping their order.
    #[must_use]
    pub fn new(results: Vec<TemplateResults>) -> Self {
        Self { results }
    }

    /// Per-template results in discovery order.
    #[must_use]
    pub fn results(&self) -> &[TemplateResults] {
        &self.results
    }

    /// Number of audited templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no template was audited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Total failing violations across all templates.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| r.file_results.failure_count())
            .sum()
    }

    /// Total warnings across all templates.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| r.file_results.warning_count())
            .sum()
    }

    /// Returns true if any template has a failing violation.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Formats failing violations as a test failure report.
    ///
    /// Produces a multi-line report suitable for `panic!()` messages in
    /// `cargo test` integration.
    #[must_use]
    pub fn format_test_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        let _ = writeln!(
            report,
            "\n=== cfn-audit: {} failing violation(s) ===\n",
            self.failure_count()
        );

        for result in &self.results {
            let failing = result
                .file_results
                .violations()
                .iter()
                .filter(|v| v.is_failing());
            for v in failing {
                let _ = writeln!(report, "{} [{}]", result.filename.display(), v.id());
                let _ = writeln!(report, "  {}", v.message());
                if !v.logical_resource_ids().is_empty() {
                    let _ = writeln!(
                        report,
                        "  = resources: {}",
                        v.logical_resource_ids().join(", ")
                    );
                }
                let _ = writeln!(report);
            }
        }

        let _ = writeln!(
            report,
            "Total: {} failure(s), {} warning(s) in {} template(s)",
            self.failure_count(),
            self.warning_count(),
            self.len()
        );

        report
    }
}
