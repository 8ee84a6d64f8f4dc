//! CloudFormation template model and parser.
//!
//! Templates are parsed from JSON or YAML into a `serde_json::Value` tree and
//! then validated into a [`CfnModel`]. YAML short-form intrinsic functions
//! (`!Ref`, `!GetAtt`, `!Sub`, ...) are expanded to their long form so rules
//! only ever see one representation.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::utils::paths::PropertyPath;

/// Errors produced while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum ParseError {
    /// The text is neither valid JSON nor valid YAML.
    #[error("{format} syntax error: {message}")]
    #[diagnostic(code(cfn_audit::parse::syntax))]
    Syntax {
        /// "JSON" or "YAML".
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// The document parsed but is not a usable template.
    #[error("Illegal cfn - {0}")]
    #[diagnostic(code(cfn_audit::parse::structure))]
    Structure(String),
}

/// A template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name.
    pub logical_id: String,
    /// Raw declaration (`Type`, `Default`, `NoEcho`, ...).
    pub body: Value,
}

/// A template resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Key of the resource in the `Resources` section.
    pub logical_id: String,
    /// Resource type such as `AWS::S3::Bucket`.
    pub resource_type: String,
    /// `Properties` object (empty object when absent).
    pub properties: Value,
    /// `Metadata` object, if any.
    pub metadata: Option<Value>,
}

impl Resource {
    /// Returns a top-level property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns a nested property addressed by a path such as `Logging.Bucket`.
    #[must_use]
    pub fn property_at(&self, path: &PropertyPath) -> Option<&Value> {
        path.lookup(&self.properties)
    }
}

/// Parsed template.
///
/// Resources are keyed by logical id and iterate in sorted order, which keeps
/// rule output deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfnModel {
    resources: BTreeMap<String, Resource>,
    parameters: BTreeMap<String, Parameter>,
}

impl CfnModel {
    /// All resources, sorted by logical id.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resources of one type, sorted by logical id.
    pub fn resources_by_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Looks up a resource by logical id.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }
}

/// Parses template text into a [`CfnModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CfnParser;

impl CfnParser {
    /// Creates a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses JSON or YAML template text.
    ///
    /// Text whose first non-blank character is `{` is tried as JSON first.
    /// If that fails it is read as flow-style YAML, and the JSON error is
    /// reported only when YAML rejects it too. Everything else is YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the text is not valid JSON/YAML or does not
    /// describe a template with at least one typed resource.
    pub fn parse(&self, text: &str) -> Result<CfnModel, ParseError> {
        let document = if text.trim_start().starts_with('{') {
            match serde_json::from_str(text) {
                Ok(document) => document,
                Err(json_error) => parse_yaml(text).map_err(|_| ParseError::Syntax {
                    format: "JSON",
                    message: json_error.to_string(),
                })?,
            }
        } else {
            parse_yaml(text)?
        };

        build_model(&document)
    }
}

fn parse_yaml(text: &str) -> Result<Value, ParseError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| ParseError::Syntax {
        format: "YAML",
        message: e.to_string(),
    })?;
    yaml_to_json(yaml)
}

fn build_model(document: &Value) -> Result<CfnModel, ParseError> {
    let Value::Object(root) = document else {
        return Err(ParseError::Structure(
            "template must be a mapping".to_string(),
        ));
    };

    let resources = match root.get("Resources") {
        Some(Value::Object(map)) if !map.is_empty() => map,
        Some(Value::Object(_)) | None => {
            return Err(ParseError::Structure("no Resources".to_string()));
        }
        Some(_) => {
            return Err(ParseError::Structure(
                "Resources must be a mapping".to_string(),
            ));
        }
    };

    let resources = resources
        .iter()
        .map(|(id, body)| build_resource(id, body).map(|r| (id.clone(), r)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let parameters = match root.get("Parameters") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, body)| (name.clone(), build_parameter(name, body)))
            .collect(),
        Some(Value::Null) | None => BTreeMap::new(),
        Some(_) => {
            return Err(ParseError::Structure(
                "Parameters must be a mapping".to_string(),
            ));
        }
    };

    Ok(CfnModel {
        resources,
        parameters,
    })
}

fn build_resource(logical_id: &str, body: &Value) -> Result<Resource, ParseError> {
    let Value::Object(body) = body else {
        return Err(ParseError::Structure(format!(
            "resource {logical_id} must be a mapping"
        )));
    };

    let resource_type = body
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::Structure(format!("resource {logical_id} is missing Type")))?;

    let properties = match body.get("Properties") {
        Some(Value::Object(props)) => Value::Object(props.clone()),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(_) => {
            return Err(ParseError::Structure(format!(
                "resource {logical_id} Properties must be a mapping"
            )));
        }
    };

    Ok(Resource {
        logical_id: logical_id.to_string(),
        resource_type: resource_type.to_string(),
        properties,
        metadata: body.get("Metadata").cloned(),
    })
}

fn build_parameter(name: &str, body: &Value) -> Parameter {
    Parameter {
        logical_id: name.to_string(),
        body: body.clone(),
    }
}

/// Converts a YAML tree into JSON, expanding CloudFormation short-form tags.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, ParseError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let tag = tag.trim_start_matches('!').to_string();
            expand_short_form(&tag, yaml_to_json(tagged.value)?)
        }
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, ParseError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(ParseError::Structure(format!(
            "unsupported mapping key: {other:?}"
        ))),
    }
}

/// Expands a short-form intrinsic (`!GetAtt A.B`) into `{"Fn::GetAtt": [A, B]}`.
fn expand_short_form(tag: &str, value: Value) -> Value {
    let key = if tag == "Ref" || tag == "Condition" {
        tag.to_string()
    } else {
        format!("Fn::{tag}")
    };

    let value = match (tag, value) {
        ("GetAtt", Value::String(s)) => match s.split_once('.') {
            Some((resource, attribute)) => Value::Array(vec![
                Value::String(resource.to_string()),
                Value::String(attribute.to_string()),
            ]),
            None => Value::String(s),
        },
        (_, value) => value,
    };

    let mut map = Map::new();
    map.insert(key, value);
    Value::Object(map)
}
