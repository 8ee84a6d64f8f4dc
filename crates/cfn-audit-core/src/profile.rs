//! Rule profiles: allow and deny lists over rule ids.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::rule::RuleDefinition;

/// Errors that can occur while loading a profile.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ProfileError {
    /// A profile names a rule that is not in the catalog.
    #[error("profile references unknown rule id `{id}`")]
    #[diagnostic(
        code(cfn_audit::profile::unknown_rule),
        help("run `cfn-audit list-rules` to see the available rule ids")
    )]
    UnknownRuleId {
        /// The unknown id.
        id: String,
    },

    /// A profile file could not be read.
    #[error("failed to read profile {path}: {source}")]
    #[diagnostic(code(cfn_audit::profile::io))]
    Io {
        /// Profile file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Whether a definition keeps or removes the ids it lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Only the listed rules may report.
    Allow,
    /// The listed rules never report.
    Deny,
}

/// One parsed profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDefinition {
    kind: ProfileKind,
    rule_ids: BTreeSet<String>,
}

impl ProfileDefinition {
    /// Parses a profile from text.
    ///
    /// One id per line; commas also separate ids. `#` starts a comment.
    #[must_use]
    pub fn parse(kind: ProfileKind, text: &str) -> Self {
        let rule_ids = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .flat_map(|line| line.split(','))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        Self { kind, rule_ids }
    }

    /// Reads and parses a profile file.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Io`] if the file cannot be read.
    pub fn from_file(kind: ProfileKind, path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(kind, &text))
    }

    /// Returns the definition kind.
    #[must_use]
    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    /// Returns the listed ids.
    #[must_use]
    pub fn rule_ids(&self) -> &BTreeSet<String> {
        &self.rule_ids
    }
}

/// A resolved predicate deciding which rules may report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    allowed: HashSet<String>,
}

impl Profile {
    /// Resolves profile definitions against the known rules.
    ///
    /// Starts from every known id, intersects with each allow list and
    /// subtracts each deny list.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownRuleId`] if a definition lists an id
    /// that no rule has.
    pub fn load(
        definitions: &[ProfileDefinition],
        rules: &[RuleDefinition],
    ) -> Result<Self, ProfileError> {
        let known: HashSet<&str> = rules.iter().map(|r| r.id.as_str()).collect();

        if let Some(id) = definitions
            .iter()
            .flat_map(|d| d.rule_ids.iter())
            .find(|id| !known.contains(id.as_str()))
        {
            return Err(ProfileError::UnknownRuleId { id: id.clone() });
        }

        let mut allowed: HashSet<String> = known.iter().map(|id| (*id).to_string()).collect();
        for definition in definitions {
            match definition.kind() {
                ProfileKind::Allow => allowed.retain(|id| definition.rule_ids.contains(id)),
                ProfileKind::Deny => allowed.retain(|id| !definition.rule_ids.contains(id)),
            }
        }

        debug!(
            "Profile allows {} of {} rule(s)",
            allowed.len(),
            known.len()
        );
        Ok(Self { allowed })
    }

    /// Returns true if violations from this rule should be kept.
    #[must_use]
    pub fn execute_rule(&self, rule_id: &str) -> bool {
        self.allowed.contains(rule_id)
    }
}
