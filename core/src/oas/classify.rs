#![deny(missing_docs)]

//! # Type and Constraint Classification
//!
//! Pure helpers that read display metadata off a merged schema: the effective
//! primitive type (inferred from keywords when `type` is omitted) and a compact
//! human rendering of its bounds.

use serde_json::{Map, Value};

/// Keyword → inferred type, checked in this order when `type` is absent.
const KEYWORD_TYPES: [(&str, &str); 17] = [
    ("multipleOf", "number"),
    ("maximum", "number"),
    ("exclusiveMaximum", "number"),
    ("minimum", "number"),
    ("exclusiveMinimum", "number"),
    ("maxLength", "string"),
    ("minLength", "string"),
    ("pattern", "string"),
    ("items", "array"),
    ("maxItems", "array"),
    ("minItems", "array"),
    ("uniqueItems", "array"),
    ("maxProperties", "object"),
    ("minProperties", "object"),
    ("required", "object"),
    ("additionalProperties", "object"),
    ("properties", "object"),
];

const PRIMITIVE_TYPES: [&str; 4] = ["string", "number", "integer", "boolean"];

/// The declared `type` of a schema together with whether it admits `null`.
///
/// A `type` array (`["string", "null"]`) is reduced to its non-null members,
/// joined with ` or ` when there are several.
pub fn declared_type(schema: &Map<String, Value>) -> (Option<String>, bool) {
    match schema.get("type") {
        Some(Value::String(t)) => (Some(t.clone()), false),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            let nullable = names.contains(&"null");
            let rest: Vec<&str> = names.into_iter().filter(|t| *t != "null").collect();
            let joined = if rest.is_empty() {
                None
            } else {
                Some(rest.join(" or "))
            };
            (joined, nullable)
        }
        _ => (None, false),
    }
}

/// Returns the declared type, or the type implied by the first matching keyword.
pub fn detect_type(schema: &Map<String, Value>) -> Option<String> {
    if let (Some(declared), _) = declared_type(schema) {
        return Some(declared);
    }
    KEYWORD_TYPES
        .iter()
        .find(|(keyword, _)| schema.get(*keyword).is_some_and(|v| !v.is_null()))
        .map(|(_, ty)| (*ty).to_string())
        .or_else(|| schema.get("const").and_then(infer_value_type))
}

/// [`detect_type`], logging when the type had to be inferred.
pub(crate) fn detect_type_at(schema: &Map<String, Value>, pointer: &str) -> Option<String> {
    let detected = detect_type(schema);
    if schema.get("type").is_none() {
        if let Some(ty) = &detected {
            tracing::debug!("Schema at \"{}\" has no type, assuming \"{}\"", pointer, ty);
        }
    }
    detected
}

/// Whether the schema is a scalar (string, number, integer, boolean).
pub fn is_primitive_type(schema: &Map<String, Value>) -> bool {
    if schema.contains_key("oneOf") || schema.contains_key("anyOf") {
        return false;
    }
    match detect_type(schema) {
        Some(ty) => ty
            .split(" or ")
            .all(|part| PRIMITIVE_TYPES.contains(&part)),
        None => false,
    }
}

/// Renders length, item count and numeric bounds, then the pattern.
pub fn humanize_constraints(schema: &Map<String, Value>) -> Vec<String> {
    let mut res = Vec::new();

    if let Some(range) = humanize_range("characters", schema.get("minLength"), schema.get("maxLength")) {
        res.push(range);
    }
    if let Some(range) = humanize_range("items", schema.get("minItems"), schema.get("maxItems")) {
        res.push(range);
    }
    if let Some(range) = humanize_number_range(schema) {
        res.push(range);
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        res.push(format!("/{}/", pattern));
    }

    res
}

fn humanize_range(description: &str, min: Option<&Value>, max: Option<&Value>) -> Option<String> {
    let min = min.and_then(number_text);
    let max = max.and_then(number_text);
    match (min, max) {
        (Some(min), Some(max)) if min == max => Some(format!("{} {}", min, description)),
        (Some(min), Some(max)) => Some(format!("[ {} .. {} ] {}", min, max, description)),
        (None, Some(max)) => Some(format!("<= {} {}", max, description)),
        (Some(min), None) if min == "1" => Some("non-empty".to_string()),
        (Some(min), None) => Some(format!(">= {} {}", min, description)),
        (None, None) => None,
    }
}

fn humanize_number_range(schema: &Map<String, Value>) -> Option<String> {
    let (min, min_exclusive) = bound(schema, "minimum", "exclusiveMinimum");
    let (max, max_exclusive) = bound(schema, "maximum", "exclusiveMaximum");
    match (min, max) {
        (Some(min), Some(max)) => Some(format!(
            "{} {} .. {} {}",
            if min_exclusive { "(" } else { "[" },
            min,
            max,
            if max_exclusive { ")" } else { "]" },
        )),
        (None, Some(max)) => Some(format!("{} {}", if max_exclusive { "<" } else { "<=" }, max)),
        (Some(min), None) => Some(format!("{} {}", if min_exclusive { ">" } else { ">=" }, min)),
        (None, None) => None,
    }
}

/// Reads one numeric bound. A numeric `exclusive*` keyword (OAS 3.1) is itself
/// the bound; a boolean one flags the plain keyword as exclusive.
fn bound(schema: &Map<String, Value>, key: &str, exclusive_key: &str) -> (Option<String>, bool) {
    match schema.get(exclusive_key) {
        Some(Value::Number(n)) => (Some(n.to_string()), true),
        other => {
            let exclusive = other.and_then(Value::as_bool).unwrap_or(false);
            (schema.get(key).and_then(number_text), exclusive)
        }
    }
}

fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn infer_value_type(value: &Value) -> Option<String> {
    let ty = match value {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(num) if num.is_i64() || num.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => return None,
    };
    Some(ty.to_string())
}
