//! Helpers for reading property values that may use intrinsic functions.

use cfn_audit_core::CfnModel;
use serde_json::Value;

/// Resolves `{"Ref": "Param"}` to the parameter's `Default`, if it has one.
///
/// Any other value is returned unchanged.
pub(crate) fn resolve<'a>(model: &'a CfnModel, value: &'a Value) -> &'a Value {
    let Some(name) = value.get("Ref").and_then(Value::as_str) else {
        return value;
    };
    match model.parameter(name).and_then(|p| p.body.get("Default")) {
        Some(default) => default,
        None => {
            tracing::trace!("Ref {} has no parameter default", name);
            value
        }
    }
}

/// Returns true for `true` or the string `"true"` (any case).
pub(crate) fn is_true(model: &CfnModel, value: &Value) -> bool {
    match resolve(model, value) {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Returns the string a value resolves to, if any.
pub(crate) fn as_str<'a>(model: &'a CfnModel, value: &'a Value) -> Option<&'a str> {
    resolve(model, value).as_str()
}

/// Returns the logical id named by `{"Ref": id}` or `{"Fn::GetAtt": [id, attr]}`.
pub(crate) fn referenced_id(value: &Value) -> Option<&str> {
    if let Some(id) = value.get("Ref").and_then(Value::as_str) {
        return Some(id);
    }
    match value.get("Fn::GetAtt")? {
        Value::Array(parts) => parts.first().and_then(Value::as_str),
        Value::String(dotted) => dotted.split('.').next(),
        _ => None,
    }
}

/// Iterates a property that may hold one object or a list of objects.
pub(crate) fn one_or_many(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    let items: &[Value] = match value {
        Some(Value::Array(items)) => items,
        Some(single) => std::slice::from_ref(single),
        None => &[],
    };
    items.iter()
}
