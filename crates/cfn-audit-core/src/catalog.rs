//! Rule catalog: registration, custom rule loading, and execution.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::declarative::{self, LoadRulesError};
use crate::model::CfnModel;
use crate::rule::{Rule, RuleBox, RuleDefinition};
use crate::types::{Violation, ViolationType, FATAL_RULE_ID};
use crate::utils::suppression::check_suppression;

/// Errors that can occur while assembling a catalog.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CatalogError {
    /// Two rules share the same id.
    #[error("duplicate rule id `{id}`")]
    #[diagnostic(
        code(cfn_audit::catalog::duplicate_id),
        help("rule ids must be unique across built-in and custom rules")
    )]
    DuplicateRuleId {
        /// The repeated id.
        id: String,
    },

    /// A rule tried to use the reserved parse-failure id.
    #[error("rule id `FATAL` is reserved")]
    #[diagnostic(code(cfn_audit::catalog::reserved_id))]
    ReservedRuleId,

    /// The rule directory could not be read.
    #[error("failed to read rule directory {path}: {source}")]
    #[diagnostic(code(cfn_audit::catalog::io))]
    Io {
        /// Directory or file that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A rule file is invalid.
    #[error("invalid rule file {path}: {source}")]
    #[diagnostic(code(cfn_audit::catalog::rule_file))]
    RuleFile {
        /// Offending file.
        path: PathBuf,
        /// Parse or validation error.
        source: LoadRulesError,
    },
}

/// The set of rules an auditor runs against every template.
///
/// Rules run in registration order, so output is stable for a given catalog.
#[derive(Default)]
pub struct RuleCatalog {
    rules: Vec<RuleBox>,
    enabled_overrides: HashMap<String, bool>,
}

impl RuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog from a list of rules.
    ///
    /// # Errors
    ///
    /// Returns an error if two rules share an id.
    pub fn with_rules(rules: Vec<RuleBox>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for rule in rules {
            catalog.register(rule)?;
        }
        Ok(catalog)
    }

    /// Adds a rule to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already registered or is `FATAL`.
    pub fn register(&mut self, rule: RuleBox) -> Result<(), CatalogError> {
        if rule.id() == FATAL_RULE_ID {
            return Err(CatalogError::ReservedRuleId);
        }
        if self.rules.iter().any(|r| r.id() == rule.id()) {
            return Err(CatalogError::DuplicateRuleId {
                id: rule.id().to_string(),
            });
        }
        debug!("Registered rule {}", rule.id());
        self.rules.push(rule);
        Ok(())
    }

    /// Loads every `*.toml` rule file in `dir` (sorted by file name) and
    /// registers the rules they declare.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read, a file is invalid, or
    /// a declared id collides with an existing rule.
    pub fn load_rule_directory(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
            let path = entry.map_err(io_error(dir))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        let mut loaded = 0;
        for path in files {
            let content = std::fs::read_to_string(&path).map_err(io_error(&path))?;
            let rules = declarative::load_rules_from_toml(&content).map_err(|source| {
                CatalogError::RuleFile {
                    path: path.clone(),
                    source,
                }
            })?;
            debug!("Loaded {} rule(s) from {}", rules.len(), path.display());
            for rule in rules {
                self.register(rule)?;
                loaded += 1;
            }
        }

        Ok(loaded)
    }

    /// Overrides whether a rule runs, regardless of its default.
    pub fn set_enabled(&mut self, rule_id: impl Into<String>, enabled: bool) {
        self.enabled_overrides.insert(rule_id.into(), enabled);
    }

    /// Returns true if the rule with this id will run.
    #[must_use]
    pub fn is_enabled(&self, rule: &dyn Rule) -> bool {
        self.enabled_overrides
            .get(rule.id())
            .copied()
            .unwrap_or_else(|| rule.enabled_by_default())
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Definitions of every registered rule, in registration order.
    #[must_use]
    pub fn rule_definitions(&self) -> Vec<RuleDefinition> {
        self.rules.iter().map(|r| r.definition()).collect()
    }

    /// Ids of every registered rule.
    #[must_use]
    pub fn rule_ids(&self) -> HashSet<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Runs every enabled rule against the model.
    ///
    /// A rule that returns an error or panics contributes one failing
    /// violation describing the fault; the remaining rules still run.
    /// Resources suppressed through metadata are removed from each violation,
    /// and violations left without resources are dropped.
    #[must_use]
    pub fn execute(&self, model: &CfnModel) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in &self.rules {
            if !self.is_enabled(rule.as_ref()) {
                debug!("Skipping disabled rule: {}", rule.id());
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(model)));
            let found = match outcome {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    error!("Rule {} failed: {}", rule.id(), e);
                    vec![fault_violation(rule.as_ref(), &e.to_string())]
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Rule {} panicked: {}", rule.id(), message);
                    vec![fault_violation(rule.as_ref(), &message)]
                }
            };

            debug!("Rule {} produced {} violation(s)", rule.id(), found.len());
            violations.extend(
                found
                    .into_iter()
                    .filter_map(|v| apply_suppressions(model, v)),
            );
        }

        violations
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CatalogError + '_ {
    move |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn fault_violation(rule: &dyn Rule, message: &str) -> Violation {
    Violation::new(
        rule.id(),
        ViolationType::FailingViolation,
        format!("rule raised an error: {message}"),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Removes suppressed resources from a violation.
///
/// Returns `None` when every offending resource is suppressed.
fn apply_suppressions(model: &CfnModel, violation: Violation) -> Option<Violation> {
    if violation.logical_resource_ids().is_empty() {
        return Some(violation);
    }

    let remaining: Vec<String> = violation
        .logical_resource_ids()
        .iter()
        .filter(|id| {
            let Some(resource) = model.resource(id) else {
                return true;
            };
            let check = check_suppression(resource, violation.id());
            if !check.is_suppressed() {
                return true;
            }
            match check.reason() {
                Some(reason) => debug!(
                    "Suppressed {} on {}: {}",
                    violation.id(),
                    resource.logical_id,
                    reason
                ),
                None => warn!(
                    "Suppression of {} on {} is missing a reason",
                    violation.id(),
                    resource.logical_id
                ),
            }
            false
        })
        .cloned()
        .collect();

    if remaining.is_empty() {
        debug!("All resources suppressed for {}", violation.id());
        return None;
    }

    Some(
        Violation::new(
            violation.id(),
            violation.violation_type(),
            violation.message(),
        )
        .with_logical_resource_ids(remaining),
    )
}
