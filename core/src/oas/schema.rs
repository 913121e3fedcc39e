#![deny(missing_docs)]

//! # Schema Model
//!
//! Turns a raw schema node (reference, `allOf` composition, `oneOf`/`anyOf`
//! alternatives, discriminator base) into a resolved tree ready for display.
//!
//! Each node is dereferenced and merged first, then annotated, then expanded
//! into exactly one of: discriminator variants, `oneOf`/`anyOf` variants,
//! object fields, or array items. A node whose reference is already being
//! expanded higher up the tree is marked circular and left unexpanded.

use crate::error::AppResult;
use crate::oas::classify::{declared_type, detect_type_at, humanize_constraints, is_primitive_type};
use crate::oas::field::{build_fields, FieldModel};
use crate::oas::parser::{as_schema_map, ref_target, MergedSchema, OpenApiParser};
use crate::oas::pointer::{self, base_name, escape_segment, is_named_definition};
use crate::options::SampleFlags;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// A resolved, display-annotated schema node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaModel {
    /// Pointer identifying the node.
    pub pointer: String,
    /// Declared or inferred type (`"any"` when nothing can be inferred).
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Type shown to readers; for arrays this is the item type.
    pub display_type: String,
    /// Prefix shown before `display_type` (e.g. `"Array of "`).
    pub type_prefix: String,
    /// Explicit title, or the definition name.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Scalar value (or array of scalars).
    pub is_primitive: bool,
    /// The reference was already being expanded; nothing below is populated.
    pub is_circular: bool,
    /// `format` keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Admits `null`.
    pub nullable: bool,
    /// Marked deprecated.
    pub deprecated: bool,
    /// `pattern` keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// `example` keyword (for arrays, lifted from the items when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Allowed values.
    #[serde(rename = "enum")]
    pub enum_values: Vec<Value>,
    /// `default` keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Only present in responses.
    pub read_only: bool,
    /// Only present in requests.
    pub write_only: bool,
    /// Human readable bounds.
    pub constraints: Vec<String>,
    /// Object members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldModel>>,
    /// Array item schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaModel>>,
    /// Alternatives (`oneOf`, `anyOf` or discriminator-derived types).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaModel>>,
    /// `"One of"` or `"Any of"` for composed alternatives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of_type: Option<String>,
    /// Property selecting the derived type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator_prop: Option<String>,
    /// Index of the alternative currently shown.
    pub active_one_of: usize,
    /// Node before `allOf` merging (after dereferencing).
    #[serde(skip)]
    pub raw_schema: Value,
    /// Node after `allOf` merging.
    #[serde(skip)]
    pub schema: Map<String, Value>,
    /// References met while merging `allOf`.
    #[serde(skip)]
    pub parent_refs: Vec<String>,
}

impl SchemaModel {
    /// Builds the model for `schema_or_ref`.
    ///
    /// * `pointer` - location of the node; replaced by the `$ref` when the node is a reference.
    /// * `is_child` - the node is a discriminator-derived variant: its `allOf`
    ///   is dereferenced even when circular, and it does not expand its own
    ///   discriminator again.
    pub fn new(
        parser: &OpenApiParser,
        schema_or_ref: &Value,
        pointer: &str,
        is_child: bool,
    ) -> AppResult<Self> {
        let pointer = ref_target(schema_or_ref).unwrap_or(pointer).to_string();
        let raw = parser.deref(schema_or_ref, false);
        let merged = parser.merge_all_of(&as_schema_map(&raw.value), Some(&pointer), is_child)?;

        let mut model = Self::annotate(pointer, raw.value.clone(), &merged);
        if !model.is_circular {
            model.expand(parser, &merged, is_child)?;
        }

        // visits taken by `raw` and `merged` stay open until the subtree is built
        drop(merged);
        drop(raw);
        Ok(model)
    }

    fn annotate(pointer: String, raw_schema: Value, merged: &MergedSchema<'_>) -> Self {
        let schema = &merged.schema;
        let (_, type_nullable) = declared_type(schema);
        let schema_type = detect_type_at(schema, &pointer).unwrap_or_else(|| "any".to_string());

        let title = str_field(schema, "title")
            .or_else(|| {
                if is_named_definition(&pointer) {
                    base_name(&pointer, 1)
                } else {
                    None
                }
            })
            .unwrap_or_default();

        let enum_values = match (schema.get("enum"), schema.get("const")) {
            (Some(Value::Array(values)), _) => values.clone(),
            (_, Some(value)) => vec![value.clone()],
            _ => Vec::new(),
        };

        Self {
            display_type: schema_type.clone(),
            schema_type,
            type_prefix: String::new(),
            title,
            description: str_field(schema, "description").unwrap_or_default(),
            is_primitive: is_primitive_type(schema),
            is_circular: merged.is_circular(),
            format: str_field(schema, "format"),
            nullable: type_nullable || bool_field(schema, "nullable"),
            deprecated: bool_field(schema, "deprecated"),
            pattern: str_field(schema, "pattern"),
            example: schema.get("example").cloned(),
            enum_values,
            default: schema.get("default").cloned(),
            read_only: bool_field(schema, "readOnly"),
            write_only: bool_field(schema, "writeOnly"),
            constraints: humanize_constraints(schema),
            fields: None,
            items: None,
            one_of: None,
            one_of_type: None,
            discriminator_prop: None,
            active_one_of: 0,
            raw_schema,
            schema: schema.clone(),
            parent_refs: merged.parent_refs.clone(),
            pointer,
        }
    }

    fn expand(
        &mut self,
        parser: &OpenApiParser,
        merged: &MergedSchema<'_>,
        is_child: bool,
    ) -> AppResult<()> {
        let schema = &merged.schema;

        if !is_child {
            if let Some(discriminator) = schema.get("discriminator") {
                if self.init_discriminator(parser, discriminator, merged)? {
                    return Ok(());
                }
            }
        }

        if let Some(one_of) = schema.get("oneOf") {
            if schema.contains_key("anyOf") {
                parser.warn(format!(
                    "oneOf and anyOf are not supported on the same level. Skipping anyOf at {}",
                    self.pointer
                ));
            }
            self.init_one_of(parser, one_of, "oneOf")?;
            self.one_of_type = Some("One of".to_string());
            return Ok(());
        }

        if let Some(any_of) = schema.get("anyOf") {
            self.init_one_of(parser, any_of, "anyOf")?;
            self.one_of_type = Some("Any of".to_string());
            return Ok(());
        }

        if self.schema_type == "object" {
            self.fields = Some(build_fields(parser, schema, &self.pointer)?);
        } else if self.schema_type == "array" {
            if let Some(items) = schema.get("items") {
                self.init_items(parser, items)?;
            }
        }
        Ok(())
    }

    fn init_items(&mut self, parser: &OpenApiParser, items: &Value) -> AppResult<()> {
        let items = SchemaModel::new(parser, items, &pointer::join(&self.pointer, ["items"]), false)?;
        self.display_type = items.display_type.clone();
        self.type_prefix = format!("{}Array of ", items.type_prefix);
        self.is_primitive = items.is_primitive;
        if self.example.is_none() {
            if let Some(example) = &items.example {
                self.example = Some(Value::Array(vec![example.clone()]));
            }
        }
        if items.is_primitive {
            self.enum_values = items.enum_values.clone();
        }
        self.items = Some(Box::new(items));
        Ok(())
    }

    /// Builds one variant per alternative, each merged with the sibling
    /// keywords of this schema.
    fn init_one_of(&mut self, parser: &OpenApiParser, variants: &Value, keyword: &str) -> AppResult<()> {
        let Some(variants) = variants.as_array() else {
            parser.warn(format!("{} must be a list at \"{}\", ignoring it", keyword, self.pointer));
            return Ok(());
        };

        let mut base = self.schema.clone();
        base.remove("oneOf");
        base.remove("anyOf");
        // variants keep their own name
        base.remove("title");
        let base = Value::Object(base);

        let mut models = Vec::with_capacity(variants.len());
        for (idx, variant) in variants.iter().enumerate() {
            let composed = json!({ "allOf": [variant, base] });
            let variant_pointer = pointer::join(&self.pointer, [keyword.to_string(), idx.to_string()]);
            models.push(SchemaModel::new(parser, &composed, &variant_pointer, false)?);
        }

        self.display_type = models
            .iter()
            .map(|m| m.display_type.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        self.one_of = Some(models);
        Ok(())
    }

    /// Expands the types derived from this discriminator base.
    ///
    /// Returns `false` (leaving the node for ordinary expansion) when no
    /// derived type is found.
    fn init_discriminator(
        &mut self,
        parser: &OpenApiParser,
        discriminator: &Value,
        merged: &MergedSchema<'_>,
    ) -> AppResult<bool> {
        self.discriminator_prop = match discriminator {
            Value::String(prop) => Some(prop.clone()),
            other => other.get("propertyName").and_then(Value::as_str).map(str::to_string),
        };

        let mut refs = merged.parent_refs.clone();
        refs.push(self.pointer.clone());
        let mut derived = parser.find_derived(&refs);

        if let Some(one_of) = merged.schema.get("oneOf").and_then(Value::as_array) {
            for reference in one_of.iter().filter_map(ref_target) {
                if let Some(name) = base_name(reference, 1) {
                    derived.insert(reference.to_string(), name);
                }
            }
        }

        if let Some(mapping) = discriminator.get("mapping").and_then(Value::as_object) {
            for (name, target) in mapping {
                if let Some(target) = target.as_str() {
                    derived.insert(mapping_target(target), name.clone());
                }
            }
        }

        if derived.is_empty() {
            return Ok(false);
        }

        let mut variants = Vec::with_capacity(derived.len());
        for (reference, name) in &derived {
            let target = parser.by_ref(reference);
            let mut variant = SchemaModel::new(parser, &target, reference, true)?;
            variant.title = name.clone();
            variants.push(variant);
        }
        self.one_of = Some(variants);
        Ok(true)
    }

    /// Sets the alternative shown. Out-of-range indices are ignored.
    pub fn activate_one_of(&mut self, idx: usize) -> bool {
        let available = self.one_of.as_ref().map_or(0, Vec::len);
        if idx < available {
            self.active_one_of = idx;
            true
        } else {
            false
        }
    }

    /// The alternative currently shown.
    pub fn active_variant(&self) -> Option<&SchemaModel> {
        self.one_of.as_ref().and_then(|variants| variants.get(self.active_one_of))
    }

    /// Type label with its prefix, e.g. `"Array of string"`.
    pub fn display_label(&self) -> String {
        format!("{}{}", self.type_prefix, self.display_type)
    }

    /// Fields visible to a sample or media consumer.
    pub fn fields_for(&self, flags: SampleFlags) -> Vec<&FieldModel> {
        self.fields
            .iter()
            .flatten()
            .filter(|f| !(flags.skip_read_only && f.schema.read_only))
            .filter(|f| !(flags.skip_write_only && f.schema.write_only))
            .filter(|f| !flags.only_required || f.required)
            .collect()
    }
}

/// Mapping values are pointers, or bare names of `components/schemas` entries.
fn mapping_target(target: &str) -> String {
    if target.contains('/') || target.starts_with('#') {
        target.to_string()
    } else {
        format!("#/components/schemas/{}", escape_segment(target))
    }
}

fn str_field(schema: &Map<String, Value>, key: &str) -> Option<String> {
    schema.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(schema: &Map<String, Value>, key: &str) -> bool {
    schema.get(key).and_then(Value::as_bool).unwrap_or(false)
}
