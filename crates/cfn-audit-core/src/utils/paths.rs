//! Property path utilities for resource analysis.

use serde_json::Value;

/// A dot-separated path into a resource's `Properties`.
///
/// Segments address object keys, array indices (`Tags.0.Key`), or every
/// element of an array or object (`*`).
///
/// # Examples
///
/// ```
/// use cfn_audit_core::utils::PropertyPath;
/// use serde_json::json;
///
/// let props = json!({ "Logging": { "Bucket": "logs" } });
/// let path = PropertyPath::parse("Logging.Bucket").unwrap();
/// assert_eq!(path.lookup(&props), Some(&json!("logs")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parses a dot-separated path.
    ///
    /// Returns `None` if the path is empty or contains an empty segment.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { segments })
    }

    /// Builds a path from already-split segments.
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the first value the path resolves to.
    #[must_use]
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.lookup_all(root).into_iter().next()
    }

    /// Returns every value the path resolves to, in document order.
    #[must_use]
    pub fn lookup_all<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            current = current
                .into_iter()
                .flat_map(|value| step(value, segment))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Vec<&'a Value> {
    match (value, segment) {
        (Value::Array(items), "*") => items.iter().collect(),
        (Value::Object(map), "*") => map.values().collect(),
        (Value::Array(items), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .into_iter()
            .collect(),
        (Value::Object(map), key) => map.get(key).into_iter().collect(),
        _ => Vec::new(),
    }
}
