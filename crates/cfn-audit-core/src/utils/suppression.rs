//! Metadata-based suppression directives.
//!
//! Supports resource metadata like:
//! ```yaml
//! Metadata:
//!   cfn_nag:
//!     rules_to_suppress:
//!       - id: W2
//!         reason: "Public load balancer"
//! ```
//!
//! `cfn_audit` is accepted as an alias for the `cfn_nag` key.

use serde_json::Value;

use crate::model::Resource;

/// Metadata keys that may hold a `rules_to_suppress` list.
const SUPPRESSION_KEYS: &[&str] = &["cfn_nag", "cfn_audit"];

/// Result of checking a resource for a suppression directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressCheck {
    /// Rule is not suppressed.
    Active,
    /// Rule is suppressed with optional reason.
    Suppressed {
        /// The reason provided (if any).
        reason: Option<String>,
    },
}

impl SuppressCheck {
    /// Returns true if suppressed.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed { .. })
    }

    /// Returns the reason if suppressed.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Suppressed { reason } => reason.as_deref(),
            Self::Active => None,
        }
    }
}

/// Checks a resource's metadata for a suppression of `rule_id`.
#[must_use]
pub fn check_suppression(resource: &Resource, rule_id: &str) -> SuppressCheck {
    let Some(metadata) = resource.metadata.as_ref() else {
        return SuppressCheck::Active;
    };

    SUPPRESSION_KEYS
        .iter()
        .filter_map(|key| metadata.get(key))
        .filter_map(|section| section.get("rules_to_suppress"))
        .filter_map(Value::as_array)
        .flatten()
        .find(|entry| entry.get("id").and_then(Value::as_str) == Some(rule_id))
        .map_or(SuppressCheck::Active, |entry| SuppressCheck::Suppressed {
            reason: entry
                .get("reason")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(metadata: Option<Value>) -> Resource {
        Resource {
            logical_id: "Sg".to_string(),
            resource_type: "AWS::EC2::SecurityGroup".to_string(),
            properties: json!({}),
            metadata,
        }
    }

    #[test]
    fn test_no_metadata_is_active() {
        assert_eq!(check_suppression(&resource(None), "W2"), SuppressCheck::Active);
    }

    #[test]
    fn test_suppressed_with_reason() {
        let r = resource(Some(json!({
            "cfn_nag": {
                "rules_to_suppress": [
                    { "id": "F1000", "reason": "egress managed elsewhere" },
                    { "id": "W2", "reason": "public load balancer" }
                ]
            }
        })));

        let check = check_suppression(&r, "W2");
        assert!(check.is_suppressed());
        assert_eq!(check.reason(), Some("public load balancer"));
    }

    #[test]
    fn test_suppressed_without_reason() {
        let r = resource(Some(json!({
            "cfn_audit": { "rules_to_suppress": [{ "id": "W2" }] }
        })));

        let check = check_suppression(&r, "W2");
        assert!(check.is_suppressed());
        assert_eq!(check.reason(), None);
    }

    #[test]
    fn test_blank_reason_counts_as_missing() {
        let r = resource(Some(json!({
            "cfn_nag": { "rules_to_suppress": [{ "id": "W2", "reason": "  " }] }
        })));
        assert_eq!(check_suppression(&r, "W2").reason(), None);
    }

    #[test]
    fn test_other_rule_stays_active() {
        let r = resource(Some(json!({
            "cfn_nag": { "rules_to_suppress": [{ "id": "W2", "reason": "ok" }] }
        })));
        assert!(!check_suppression(&r, "F1000").is_suppressed());
    }

    #[test]
    fn test_malformed_section_is_ignored() {
        let r = resource(Some(json!({ "cfn_nag": { "rules_to_suppress": "W2" } })));
        assert!(!check_suppression(&r, "W2").is_suppressed());
    }
}
