#![deny(missing_docs)]

//! # OpenAPI Parser
//!
//! Owns one loaded document and provides the raw operations every model is
//! built from:
//! - `$ref` lookup and dereferencing with circular reference detection.
//! - `allOf` merging.
//! - Discovery of definitions derived from a base schema.
//!
//! Per-node problems that do not prevent rendering are reported as warnings
//! (logged through `tracing` and kept for [`OpenApiParser::warnings`]).

use crate::error::{AppError, AppResult};
use crate::oas::pointer::{self, base_name, is_named_definition, normalize_ref_to_local};
use crate::oas::ref_counter::{RefCounter, RefGuard};
use crate::oas::schema::SchemaModel;
use crate::options::NormalizedOptions;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::cell::RefCell;

/// Key set on a dereferenced schema whose target was already being expanded.
pub const CIRCULAR_MARKER: &str = "x-circular-ref";

const SCHEMAS_POINTER: &str = "#/components/schemas";

/// Keywords `merge_all_of` combines with dedicated rules instead of overlaying.
const MERGED_KEYWORDS: [&str; 3] = ["type", "properties", "required"];

/// Returns the `$ref` string of a reference node.
pub fn ref_target(node: &Value) -> Option<&str> {
    node.get("$ref").and_then(Value::as_str)
}

/// Copies a schema node as a mapping. Non-mapping nodes (boolean schemas,
/// placeholders) become an empty schema.
pub fn as_schema_map(node: &Value) -> Map<String, Value> {
    match node {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

/// A node after dereferencing, holding the visit of its reference (if any).
///
/// Dropping it exits the reference.
#[derive(Debug)]
pub struct Dereferenced<'p> {
    /// The resolved node.
    pub value: Value,
    guard: Option<RefGuard<'p>>,
}

impl<'p> Dereferenced<'p> {
    fn plain(value: Value) -> Self {
        Self { value, guard: None }
    }

    /// The reference whose visit is held, if the input was a reference.
    pub fn reference(&self) -> Option<&str> {
        self.guard.as_ref().map(RefGuard::pointer)
    }

    /// Whether the reference was already being expanded.
    pub fn is_circular(&self) -> bool {
        self.value.get(CIRCULAR_MARKER) == Some(&Value::Bool(true))
    }

    /// Returns the value and keeps the visit open.
    ///
    /// The caller must balance it with [`OpenApiParser::exit_ref`] on the
    /// original reference node.
    pub fn detach(self) -> Value {
        if let Some(guard) = self.guard {
            guard.into_manual();
        }
        self.value
    }
}

/// Result of [`OpenApiParser::merge_all_of`].
///
/// Holds the visits of every reference dereferenced while merging; they are
/// exited when the merged schema is dropped.
#[derive(Debug)]
pub struct MergedSchema<'p> {
    /// The merged schema, without `allOf`.
    pub schema: Map<String, Value>,
    /// Every `$ref` met while descending through `allOf` branches.
    pub parent_refs: Vec<String>,
    guards: Vec<RefGuard<'p>>,
}

impl<'p> MergedSchema<'p> {
    fn unchanged(schema: Map<String, Value>) -> Self {
        Self {
            schema,
            parent_refs: Vec::new(),
            guards: Vec::new(),
        }
    }

    /// Whether the merge pulled in a circular reference marker.
    pub fn is_circular(&self) -> bool {
        self.schema.get(CIRCULAR_MARKER) == Some(&Value::Bool(true))
    }
}

/// Loads and keeps the document. Provides raw document operations.
#[derive(Debug)]
pub struct OpenApiParser {
    spec: Value,
    options: NormalizedOptions,
    ref_counter: RefCell<RefCounter>,
    warnings: RefCell<Vec<String>>,
}

impl OpenApiParser {
    /// Wraps an already deserialized document.
    ///
    /// Fails with [`AppError::InvalidDocument`] when the root is not a mapping
    /// or has no `openapi` version field.
    pub fn new(spec: Value, options: NormalizedOptions) -> AppResult<Self> {
        validate(&spec)?;
        Ok(Self {
            spec,
            options,
            ref_counter: RefCell::new(RefCounter::new()),
            warnings: RefCell::new(Vec::new()),
        })
    }

    /// Parses a YAML (or JSON) document.
    pub fn from_yaml(text: &str, options: NormalizedOptions) -> AppResult<Self> {
        let spec: Value = serde_yaml::from_str(text)
            .map_err(|e| AppError::Parse(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Self::new(spec, options)
    }

    /// Parses a JSON document.
    pub fn from_json(text: &str, options: NormalizedOptions) -> AppResult<Self> {
        let spec: Value = serde_json::from_str(text)
            .map_err(|e| AppError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))?;
        Self::new(spec, options)
    }

    /// The loaded document.
    pub fn spec(&self) -> &Value {
        &self.spec
    }

    /// Options in effect for this document.
    pub fn options(&self) -> &NormalizedOptions {
        &self.options
    }

    fn self_uri(&self) -> Option<&str> {
        self.spec.get("$self").and_then(Value::as_str)
    }

    /// Checks if the node is a reference (contains a non-null `$ref`).
    pub fn is_ref(&self, node: &Value) -> bool {
        node.get("$ref").is_some_and(|r| !r.is_null())
    }

    /// Gets a document part by reference.
    ///
    /// Never fails: a pointer that does not resolve yields an empty mapping.
    pub fn by_ref(&self, reference: &str) -> Value {
        let Some(local) = normalize_ref_to_local(reference, self.self_uri()) else {
            self.warn(format!(
                "External reference \"{}\" is not supported, using an empty schema",
                reference
            ));
            return Value::Object(Map::new());
        };
        match pointer::get(&self.spec, &local) {
            Ok(Value::Null) => Value::Object(Map::new()),
            Ok(found) => found.clone(),
            Err(err) => {
                tracing::debug!("{}", err);
                Value::Object(Map::new())
            }
        }
    }

    /// Resolves a reference node, or returns the node as is.
    ///
    /// The returned value holds a visit of the reference until dropped. When
    /// the reference is already being expanded and `force_circular` is false,
    /// the target is returned with [`CIRCULAR_MARKER`] set instead of being
    /// followed further.
    pub fn deref(&self, node: &Value, force_circular: bool) -> Dereferenced<'_> {
        let Some(reference) = ref_target(node) else {
            if self.is_ref(node) {
                self.warn(format!("Invalid $ref value {}, using an empty schema", node["$ref"]));
                return Dereferenced::plain(Value::Object(Map::new()));
            }
            return Dereferenced::plain(node.clone());
        };

        let resolved = self.by_ref(reference);
        let visited = self.ref_counter.borrow().visited(reference);
        let guard = RefGuard::acquire(&self.ref_counter, reference);

        if visited && !force_circular {
            let mut marked = as_schema_map(&resolved);
            marked.insert(CIRCULAR_MARKER.to_string(), Value::Bool(true));
            return Dereferenced {
                value: Value::Object(marked),
                guard: Some(guard),
            };
        }

        // the target may itself be a reference
        if self.is_ref(&resolved) {
            let Dereferenced { value, guard: inner } = self.deref(&resolved, false);
            drop(inner);
            return Dereferenced {
                value,
                guard: Some(guard),
            };
        }

        Dereferenced {
            value: resolved,
            guard: Some(guard),
        }
    }

    /// Exits a reference whose visit was kept open with [`Dereferenced::detach`].
    pub fn exit_ref(&self, node: &Value) {
        if let Some(reference) = ref_target(node) {
            self.ref_counter.borrow_mut().exit(reference);
        }
    }

    /// Current in-flight count for a reference.
    pub fn ref_count(&self, reference: &str) -> usize {
        self.ref_counter.borrow().count(reference)
    }

    /// Clears visited references. Run before each top-level resolution.
    pub fn reset_visited(&self) {
        let pending = self.ref_counter.borrow_mut().reset();
        let mut warnings = self.warnings.borrow_mut();
        warnings.extend(
            pending
                .into_iter()
                .map(|p| format!("Not exited reference: {}", p)),
        );
    }

    /// Merges `allOf` constraints.
    ///
    /// * `schema` - schema possibly carrying `allOf`.
    /// * `pointer` - pointer of the schema, used for naming and errors.
    /// * `force_circular` - dereference branches even if they are circular.
    pub fn merge_all_of(
        &self,
        schema: &Map<String, Value>,
        pointer: Option<&str>,
        force_circular: bool,
    ) -> AppResult<MergedSchema<'_>> {
        let Some(all_of) = schema.get("allOf") else {
            return Ok(MergedSchema::unchanged(schema.clone()));
        };
        let Some(all_of) = all_of.as_array() else {
            self.warn(format!(
                "allOf must be a list at \"{}\", ignoring it",
                pointer.unwrap_or_default()
            ));
            let mut plain = schema.clone();
            plain.remove("allOf");
            return Ok(MergedSchema::unchanged(plain));
        };

        let named = pointer.is_some_and(is_named_definition);
        let mut receiver = schema.clone();
        receiver.remove("allOf");
        let mut parent_refs = Vec::new();
        let mut guards = Vec::new();

        let mut branches = Vec::with_capacity(all_of.len());
        for sub_schema in all_of {
            let resolved = self.deref(sub_schema, force_circular);
            let sub_ref = ref_target(sub_schema).map(str::to_string);
            let sub_merged =
                self.merge_all_of(&as_schema_map(&resolved.value), sub_ref.as_deref(), force_circular)?;
            parent_refs.extend(sub_merged.parent_refs);
            guards.extend(sub_merged.guards);
            guards.extend(resolved.guard);
            branches.push((sub_ref, sub_merged.schema));
        }

        for (sub_ref, sub_schema) in branches {
            let receiver_type = receiver.get("type").filter(|t| !t.is_null());
            let sub_type = sub_schema.get("type").filter(|t| !t.is_null());
            if let (Some(a), Some(b)) = (receiver_type, sub_type) {
                if a != b {
                    return Err(AppError::IncompatibleAllOfTypes {
                        pointer: pointer.unwrap_or_default().to_string(),
                    });
                }
            }
            if let Some(ty) = sub_type {
                receiver.insert("type".to_string(), ty.clone());
            }

            if let Some(Value::Object(sub_props)) = sub_schema.get("properties") {
                let mut props = match receiver.remove("properties") {
                    Some(Value::Object(existing)) => existing,
                    _ => Map::new(),
                };
                for (name, prop) in sub_props {
                    let merged_prop = match props.get(name) {
                        Some(existing) if !existing.is_null() => {
                            let wrapper = as_schema_map(&json!({ "allOf": [existing, prop] }));
                            let prop_pointer =
                                pointer::join(pointer.unwrap_or_default(), ["properties", name.as_str()]);
                            let inner = self.merge_all_of(&wrapper, Some(&prop_pointer), false)?;
                            guards.extend(inner.guards);
                            Value::Object(inner.schema)
                        }
                        _ => prop.clone(),
                    };
                    props.insert(name.clone(), merged_prop);
                }
                receiver.insert("properties".to_string(), Value::Object(props));
            }

            if let Some(Value::Array(sub_required)) = sub_schema.get("required") {
                let mut required = match receiver.remove("required") {
                    Some(Value::Array(existing)) => existing,
                    _ => Vec::new(),
                };
                required.extend(sub_required.iter().cloned());
                receiver.insert("required".to_string(), Value::Array(required));
            }

            // remaining keywords: later branches override earlier ones, the
            // schema's own sibling keywords override every branch
            for (key, value) in sub_schema {
                if MERGED_KEYWORDS.contains(&key.as_str()) || schema.contains_key(&key) {
                    continue;
                }
                receiver.insert(key, value);
            }

            if let Some(sub_ref) = sub_ref {
                // inline compositions are named after the definition they pull in
                if !named && !receiver.contains_key("title") && is_named_definition(&sub_ref) {
                    if let Some(name) = base_name(&sub_ref, 1) {
                        receiver.insert("title".to_string(), Value::String(name));
                    }
                }
                parent_refs.push(sub_ref);
            }
        }

        // name of definition when no title survived the merge
        if let Some(pointer) = pointer.filter(|_| named) {
            if !receiver.contains_key("title") {
                if let Some(name) = base_name(pointer, 1) {
                    receiver.insert("title".to_string(), Value::String(name));
                }
            }
        }

        Ok(MergedSchema {
            schema: receiver,
            parent_refs,
            guards,
        })
    }

    /// Finds all definitions among `#/components/schemas` deriving (through a
    /// direct `allOf` entry) from any of `refs`.
    ///
    /// Returns definition pointer → definition name, in document order.
    pub fn find_derived(&self, refs: &[String]) -> IndexMap<String, String> {
        let mut derived = IndexMap::new();
        let Some(schemas) = self
            .spec
            .pointer("/components/schemas")
            .and_then(Value::as_object)
        else {
            return derived;
        };

        for (name, definition) in schemas {
            let def = self.deref(definition, false);
            let is_derived = def
                .value
                .get("allOf")
                .and_then(Value::as_array)
                .is_some_and(|all_of| {
                    all_of
                        .iter()
                        .filter_map(ref_target)
                        .any(|r| refs.iter().any(|candidate| candidate == r))
                });
            if is_derived {
                derived.insert(pointer::join(SCHEMAS_POINTER, [name]), name.clone());
            }
        }
        derived
    }

    /// Names of all `components/schemas` definitions, in document order.
    pub fn named_schemas(&self) -> Vec<String> {
        self.spec
            .pointer("/components/schemas")
            .and_then(Value::as_object)
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Builds the resolved schema tree for `pointer`.
    ///
    /// Starts from a reference to `pointer`, so a direct self-reference is
    /// reported circular at its first occurrence.
    ///
    /// A bare pointer (`/components/...`) is treated as local (`#/components/...`).
    pub fn resolve_schema(&self, pointer: &str) -> AppResult<SchemaModel> {
        let pointer = if pointer.starts_with('/') {
            format!("#{}", pointer)
        } else {
            pointer.to_string()
        };
        self.reset_visited();
        SchemaModel::new(self, &json!({ "$ref": pointer }), &pointer, false)
    }

    /// Records a non-fatal diagnostic.
    pub(crate) fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.borrow_mut().push(message);
    }

    /// Diagnostics collected so far.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Returns and clears the collected diagnostics.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }
}

fn validate(spec: &Value) -> AppResult<()> {
    let Some(root) = spec.as_object() else {
        return Err(AppError::InvalidDocument(
            "Document root must be a mapping".into(),
        ));
    };
    if root.get("openapi").map_or(true, Value::is_null) {
        return Err(AppError::InvalidDocument(
            "Document must be valid OpenAPI 3.0.0 definition".into(),
        ));
    }
    Ok(())
}
