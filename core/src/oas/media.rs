#![deny(missing_docs)]

//! # Media Types
//!
//! Request and response payloads. A `content` map becomes one
//! [`MediaTypeModel`] per media type, each resolving its schema and carrying
//! the sample flags of its direction (request or response).

use crate::error::AppResult;
use crate::oas::field::FieldModel;
use crate::oas::parser::{as_schema_map, OpenApiParser};
use crate::oas::pointer;
use crate::oas::schema::SchemaModel;
use crate::options::SampleFlags;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// A named example of a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleModel {
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Embedded example value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// URL of an example kept outside the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_value: Option<String>,
}

impl ExampleModel {
    /// Resolves an example object (or a reference to one).
    pub fn new(parser: &OpenApiParser, example_or_ref: &Value) -> Self {
        let info = as_schema_map(&parser.deref(example_or_ref, false).value);
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            summary: text("summary"),
            description: text("description"),
            value: info.get("value").cloned(),
            external_value: text("externalValue"),
        }
    }

    fn from_value(value: Value) -> Self {
        Self {
            summary: None,
            description: None,
            value: Some(value),
            external_value: None,
        }
    }
}

/// One media type of a request body or response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypeModel {
    /// Media type name, e.g. `application/json`.
    pub name: String,
    /// Payload of a request (read-only fields hidden in samples) rather than
    /// a response (write-only fields hidden).
    pub is_request_type: bool,
    /// Sample flags for this payload's direction.
    pub sample_flags: SampleFlags,
    /// Resolved payload schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaModel>,
    /// Declared examples (`examples`, or `example` as `default`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<IndexMap<String, ExampleModel>>,
}

impl MediaTypeModel {
    /// Resolves the media type object `info` located at `pointer`.
    pub fn new(
        parser: &OpenApiParser,
        name: &str,
        is_request_type: bool,
        info: &Map<String, Value>,
        pointer: &str,
    ) -> AppResult<Self> {
        let schema = match info.get("schema") {
            Some(schema) => Some(SchemaModel::new(
                parser,
                schema,
                &pointer::join(pointer, ["schema"]),
                false,
            )?),
            None => None,
        };

        let examples = match (info.get("examples"), info.get("example")) {
            (Some(Value::Object(examples)), _) => Some(
                examples
                    .iter()
                    .map(|(name, example)| (name.clone(), ExampleModel::new(parser, example)))
                    .collect(),
            ),
            (_, Some(example)) => Some(IndexMap::from([(
                "default".to_string(),
                ExampleModel::from_value(example.clone()),
            )])),
            _ => None,
        };

        Ok(Self {
            name: name.to_string(),
            is_request_type,
            sample_flags: parser.options().sample_flags(is_request_type),
            schema,
            examples,
        })
    }

    /// Top-level payload fields shown in samples for this direction.
    pub fn sample_fields(&self) -> Vec<&FieldModel> {
        self.schema
            .as_ref()
            .map(|schema| schema.fields_for(self.sample_flags))
            .unwrap_or_default()
    }
}

/// The `content` map of a request body or response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContentModel {
    /// Media types in document order.
    pub media_types: Vec<MediaTypeModel>,
    /// Request payload.
    pub is_request_type: bool,
    /// Index of the media type currently shown.
    pub active_mime_idx: usize,
}

impl MediaContentModel {
    /// Resolves every media type of `content`, located at `pointer`.
    ///
    /// Each media type is a separate top-level resolution. With
    /// `unstable_ignore_mime_parameters`, types differing only in parameters
    /// (`; charset=...`) are merged into one.
    pub fn new(
        parser: &OpenApiParser,
        content: &Value,
        is_request_type: bool,
        pointer: &str,
    ) -> AppResult<Self> {
        let mut content = as_schema_map(content);
        if parser.options().unstable_ignore_mime_parameters {
            content = merge_similar_media_types(content);
        }

        let mut media_types = Vec::with_capacity(content.len());
        for (name, info) in &content {
            parser.reset_visited();
            media_types.push(MediaTypeModel::new(
                parser,
                name,
                is_request_type,
                &as_schema_map(info),
                &pointer::join(pointer, [name.as_str()]),
            )?);
        }

        Ok(Self {
            media_types,
            is_request_type,
            active_mime_idx: 0,
        })
    }

    /// Sets the media type shown. Out-of-range indices are ignored.
    pub fn activate(&mut self, idx: usize) -> bool {
        if idx < self.media_types.len() {
            self.active_mime_idx = idx;
            true
        } else {
            false
        }
    }

    /// The media type currently shown.
    pub fn active(&self) -> Option<&MediaTypeModel> {
        self.media_types.get(self.active_mime_idx)
    }

    /// Whether any media type declares examples.
    pub fn has_sample(&self) -> bool {
        self.media_types.iter().any(|media| media.examples.is_some())
    }
}

/// Merges media types whose names match once parameters are stripped; later
/// keys win.
fn merge_similar_media_types(content: Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for (name, media) in content {
        let normalized = name.split(';').next().unwrap_or_default().trim().to_string();
        if let Some(Value::Object(existing)) = merged.get_mut(&normalized) {
            if let Value::Object(media) = media {
                existing.extend(media);
            }
            continue;
        }
        merged.insert(normalized, media);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NormalizedOptions;
    use serde_json::json;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: T, version: "1"}
components:
  examples:
    Rex:
      summary: A dog
      value: {id: 1, name: Rex}
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        id: {type: integer, readOnly: true}
        name: {type: string}
        secret: {type: string, writeOnly: true}
"#;

    fn content() -> Value {
        json!({
            "application/json": {
                "schema": {"$ref": "#/components/schemas/Pet"},
                "examples": {"rex": {"$ref": "#/components/examples/Rex"}}
            },
            "application/json; charset=utf-8": {"example": {"name": "Tom"}},
            "text/plain": {"schema": {"type": "string"}}
        })
    }

    fn names(fields: Vec<&FieldModel>) -> Vec<&str> {
        fields.into_iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_request_and_response_sample_flags() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        let request = MediaContentModel::new(&p, &content(), true, "#/req/content").unwrap();
        let json = request.active().unwrap();
        assert_eq!(json.name, "application/json");
        assert!(json.is_request_type);
        assert!(json.sample_flags.skip_read_only);
        assert_eq!(names(json.sample_fields()), vec!["name", "secret"]);

        let response = MediaContentModel::new(&p, &content(), false, "#/res/content").unwrap();
        let json = &response.media_types[0];
        assert!(json.sample_flags.skip_write_only);
        assert_eq!(names(json.sample_fields()), vec!["id", "name"]);
        assert_eq!(p.ref_count("#/components/schemas/Pet"), 0);
    }

    #[test]
    fn test_examples_are_resolved() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        let content = MediaContentModel::new(&p, &content(), true, "#/req/content").unwrap();
        assert_eq!(content.media_types.len(), 3);
        assert!(content.has_sample());

        let rex = &content.media_types[0].examples.as_ref().unwrap()["rex"];
        assert_eq!(rex.summary.as_deref(), Some("A dog"));
        assert_eq!(rex.value, Some(json!({"id": 1, "name": "Rex"})));

        let inline = &content.media_types[1].examples.as_ref().unwrap()["default"];
        assert_eq!(inline.value, Some(json!({"name": "Tom"})));
        assert!(content.media_types[1].schema.is_none());
        assert!(content.media_types[2].examples.is_none());
        assert_eq!(
            content.media_types[2].schema.as_ref().unwrap().pointer,
            "#/req/content/text~1plain/schema"
        );
    }

    #[test]
    fn test_ignore_mime_parameters_merges_types() {
        let options = NormalizedOptions {
            unstable_ignore_mime_parameters: true,
            ..NormalizedOptions::default()
        };
        let p = OpenApiParser::from_yaml(DOC, options).unwrap();
        let content = MediaContentModel::new(&p, &content(), true, "#/req/content").unwrap();
        let names: Vec<&str> = content.media_types.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["application/json", "text/plain"]);
        let json = &content.media_types[0];
        assert!(json.schema.is_some());
        assert_eq!(
            json.examples.as_ref().unwrap()["rex"].summary.as_deref(),
            Some("A dog")
        );
    }

    #[test]
    fn test_activate_media_type() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        let mut content = MediaContentModel::new(&p, &content(), false, "#/res/content").unwrap();
        assert!(content.activate(2));
        assert_eq!(content.active().unwrap().name, "text/plain");
        assert!(!content.activate(3));
        assert_eq!(content.active_mime_idx, 2);
    }
}
