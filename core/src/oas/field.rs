#![deny(missing_docs)]

//! # Field Model
//!
//! Named members of a resolved object schema, its wildcard
//! `additionalProperties` member, and operation parameters.

use crate::error::AppResult;
use crate::oas::parser::{as_schema_map, OpenApiParser};
use crate::oas::pointer;
use crate::oas::schema::SchemaModel;
use crate::options::NormalizedOptions;
use serde::Serialize;
use serde_json::{Map, Value};

/// Display name of the wildcard member built from `additionalProperties`.
pub const ADDITIONAL_PROPERTIES_NAME: &str = "property name *";

/// What a field stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// A declared property.
    Field,
    /// The `additionalProperties` wildcard.
    AdditionalProperties,
    /// An operation parameter.
    Parameter,
}

/// Input for [`FieldModel::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Member name.
    pub name: String,
    /// Listed in the parent's `required`.
    pub required: bool,
    /// Member schema (possibly a reference).
    pub schema: Value,
    /// Member kind.
    pub kind: FieldKind,
    /// Explicit description; falls back to the schema's.
    pub description: Option<String>,
    /// Explicitly deprecated.
    pub deprecated: bool,
    /// Explicit example; falls back to the schema's.
    pub example: Option<Value>,
    /// Parameter location (`query`, `path`, ...).
    pub location: Option<String>,
}

impl FieldInfo {
    /// A plain property.
    pub fn new(name: impl Into<String>, required: bool, schema: Value) -> Self {
        Self {
            name: name.into(),
            required,
            schema,
            kind: FieldKind::Field,
            description: None,
            deprecated: false,
            example: None,
            location: None,
        }
    }
}

/// A resolved member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    /// Member name.
    pub name: String,
    /// Required member.
    pub required: bool,
    /// Member kind.
    pub kind: FieldKind,
    /// Description text.
    pub description: String,
    /// Deprecated member.
    pub deprecated: bool,
    /// Example value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Parameter location.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Resolved member schema.
    pub schema: SchemaModel,
}

impl FieldModel {
    /// Resolves the member schema located at `pointer`.
    pub fn new(parser: &OpenApiParser, info: FieldInfo, pointer: &str) -> AppResult<Self> {
        let schema = SchemaModel::new(parser, &info.schema, pointer, false)?;
        Ok(Self {
            description: info
                .description
                .unwrap_or_else(|| schema.description.clone()),
            deprecated: info.deprecated || schema.deprecated,
            example: info.example.or_else(|| schema.example.clone()),
            name: info.name,
            required: info.required,
            kind: info.kind,
            location: info.location,
            schema,
        })
    }

    /// Resolves a parameter object (or a reference to one).
    pub fn from_parameter(
        parser: &OpenApiParser,
        param_or_ref: &Value,
        pointer: &str,
    ) -> AppResult<Self> {
        let param = parser.deref(param_or_ref, false);
        let info = as_schema_map(&param.value);
        let schema = info
            .get("schema")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let field = Self::new(
            parser,
            FieldInfo {
                name: string(&info, "name").unwrap_or_default(),
                required: info.get("required").and_then(Value::as_bool).unwrap_or(false),
                schema,
                kind: FieldKind::Parameter,
                description: string(&info, "description"),
                deprecated: info.get("deprecated").and_then(Value::as_bool).unwrap_or(false),
                example: info.get("example").cloned(),
                location: string(&info, "in"),
            },
            &pointer::join(param.reference().unwrap_or(pointer), ["schema"]),
        )?;
        drop(param);
        Ok(field)
    }
}

/// Builds the fields of an object schema located at `pointer`.
///
/// Malformed property entries are replaced by an empty schema and reported.
pub(crate) fn build_fields(
    parser: &OpenApiParser,
    schema: &Map<String, Value>,
    pointer: &str,
) -> AppResult<Vec<FieldModel>> {
    let empty = Map::new();
    let props = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let defaults = schema.get("default").and_then(Value::as_object);
    let required = required_names(schema);

    let mut fields = Vec::with_capacity(props.len() + 1);
    for (name, prop) in props {
        let mut field_schema = match prop {
            Value::Object(map) => map.clone(),
            other => {
                parser.warn(format!(
                    "Field \"{}\" is invalid, skipping.\n Field must be an object but got {} at \"{}\"",
                    name,
                    json_kind(other),
                    pointer
                ));
                Map::new()
            }
        };
        if !field_schema.contains_key("default") {
            if let Some(default) = defaults.and_then(|d| d.get(name)) {
                field_schema.insert("default".to_string(), default.clone());
            }
        }

        fields.push(FieldModel::new(
            parser,
            FieldInfo::new(name, required.contains(name), Value::Object(field_schema)),
            &pointer::join(pointer, ["properties", name.as_str()]),
        )?);
    }

    order_fields(&mut fields, &required, parser.options());

    if let Some(additional @ Value::Object(_)) = schema.get("additionalProperties") {
        fields.push(FieldModel::new(
            parser,
            FieldInfo {
                kind: FieldKind::AdditionalProperties,
                ..FieldInfo::new(ADDITIONAL_PROPERTIES_NAME, false, additional.clone())
            },
            &pointer::join(pointer, ["additionalProperties"]),
        )?);
    }

    Ok(fields)
}

/// Applies the configured field ordering.
pub(crate) fn order_fields(fields: &mut Vec<FieldModel>, required: &[String], options: &NormalizedOptions) {
    if options.sort_props_alphabetically {
        fields.sort_by(|a, b| a.name.cmp(&b.name));
    }
    if options.required_props_first {
        sort_by_required(fields, required);
    }
}

/// Moves required fields first: those listed in `order` in that order, then
/// other required fields, then optional ones, each group otherwise stable.
pub fn sort_by_required(fields: &mut Vec<FieldModel>, order: &[String]) {
    let position = |name: &str| order.iter().position(|o| o == name);
    let mut ordered = Vec::new();
    let mut unordered = Vec::new();
    let mut optional = Vec::new();
    for field in fields.drain(..) {
        if !field.required {
            optional.push(field);
        } else if position(&field.name).is_some() {
            ordered.push(field);
        } else {
            unordered.push(field);
        }
    }
    ordered.sort_by_key(|f| position(&f.name));
    fields.extend(ordered);
    fields.extend(unordered);
    fields.extend(optional);
}

fn required_names(schema: &Map<String, Value>) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
