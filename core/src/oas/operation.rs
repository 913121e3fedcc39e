#![deny(missing_docs)]

//! # Operations
//!
//! Resolves one operation of the document:
//! - **parameters**: those declared on the path item plus those declared on the
//!   operation, where the operation's declaration wins for the same `name` and `in`.
//! - **request body** and **responses**, each with its media types.

use crate::error::{AppError, AppResult};
use crate::oas::field::{sort_by_required, FieldModel};
use crate::oas::media::MediaContentModel;
use crate::oas::parser::{as_schema_map, ref_target, OpenApiParser};
use crate::oas::pointer;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// HTTP methods an OpenAPI path item may declare.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const NO_SUMMARY: &str = "<no summary>";

/// An operation located in the document, with its path item dereferenced.
struct LocatedOperation {
    item: Value,
    item_pointer: String,
    method: String,
    pointer: String,
}

impl LocatedOperation {
    fn operation(&self) -> &Value {
        &self.item[self.method.as_str()]
    }
}

/// Finds `method` on `path` and starts a new top-level resolution.
fn locate(parser: &OpenApiParser, path: &str, method: &str) -> AppResult<LocatedOperation> {
    let method = method.to_ascii_lowercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        return Err(AppError::General(format!("Unknown HTTP method \"{}\"", method)));
    }

    let path_pointer = pointer::join("#/paths", [path]);
    let declared = pointer::get(parser.spec(), &path_pointer)
        .map_err(|_| AppError::General(format!("Path \"{}\" is not defined", path)))?;

    parser.reset_visited();
    // path items may themselves be references
    let path_item = parser.deref(declared, false);
    let item_pointer = path_item
        .reference()
        .unwrap_or(path_pointer.as_str())
        .to_string();
    let item = path_item.value.clone();
    drop(path_item);

    if item.get(&method).is_none() {
        return Err(AppError::General(format!(
            "Operation \"{} {}\" is not defined",
            method, path
        )));
    }
    Ok(LocatedOperation {
        pointer: pointer::join(&item_pointer, [method.as_str()]),
        item,
        item_pointer,
        method,
    })
}

/// Resolves the parameters of `method` on `path` (e.g. `"/pets/{id}"`, `"get"`).
///
/// Fails when the path item or the operation is not declared.
pub fn resolve_operation_parameters(
    parser: &OpenApiParser,
    path: &str,
    method: &str,
) -> AppResult<Vec<FieldModel>> {
    let located = locate(parser, path, method)?;
    merged_parameters(parser, &located)
}

fn merged_parameters(parser: &OpenApiParser, located: &LocatedOperation) -> AppResult<Vec<FieldModel>> {
    let path_params = parameter_list(located.item.get("parameters"), &located.item_pointer);
    let operation_params = parameter_list(located.operation().get("parameters"), &located.pointer);

    let overridden: HashSet<(String, String)> = operation_params
        .iter()
        .map(|(param, _)| parameter_key(parser, param))
        .collect();

    let mut fields = Vec::with_capacity(path_params.len() + operation_params.len());
    for (param, param_pointer) in path_params
        .into_iter()
        .filter(|(param, _)| !overridden.contains(&parameter_key(parser, param)))
        .chain(operation_params)
    {
        fields.push(FieldModel::from_parameter(parser, param, &param_pointer)?);
    }

    if parser.options().required_props_first {
        sort_by_required(&mut fields, &[]);
    }
    Ok(fields)
}

fn parameter_list<'v>(params: Option<&'v Value>, owner: &str) -> Vec<(&'v Value, String)> {
    params
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .enumerate()
                .map(|(idx, param)| (param, pointer::join(owner, ["parameters".to_string(), idx.to_string()])))
                .collect()
        })
        .unwrap_or_default()
}

/// `name` + `in` of a parameter, looked up without visiting the reference.
fn parameter_key(parser: &OpenApiParser, param: &Value) -> (String, String) {
    let resolved;
    let param = match ref_target(param) {
        Some(reference) => {
            resolved = parser.by_ref(reference);
            &resolved
        }
        None => param,
    };
    let field = |key: &str| {
        param
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("name"), field("in"))
}

/// Every `(path, method)` declared in the document, in document order.
pub fn list_operations(parser: &OpenApiParser) -> Vec<(String, String)> {
    let Some(paths) = parser.spec().get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut operations = Vec::new();
    for (path, item) in paths {
        let item = parser.deref(item, false);
        if let Some(item) = item.value.as_object() {
            operations.extend(
                item.keys()
                    .filter(|key| HTTP_METHODS.contains(&key.as_str()))
                    .map(|method| (path.clone(), method.clone())),
            );
        }
    }
    operations
}

/// Classification of a response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    /// 1xx.
    Info,
    /// 2xx, or `default` when the operation declares no success response.
    Success,
    /// 3xx.
    Redirect,
    /// 4xx and 5xx, or `default` next to declared success responses.
    Error,
}

/// Classifies a status code key (`"404"`, `"default"`).
///
/// Returns `None` for codes outside 100-599 and keys that are not codes.
pub fn status_code_type(code: &str, default_as_error: bool) -> Option<ResponseType> {
    if code == "default" {
        return Some(if default_as_error {
            ResponseType::Error
        } else {
            ResponseType::Success
        });
    }
    match code.parse::<u16>().ok()? {
        100..=199 => Some(ResponseType::Info),
        200..=299 => Some(ResponseType::Success),
        300..=399 => Some(ResponseType::Redirect),
        400..=599 => Some(ResponseType::Error),
        _ => None,
    }
}

/// A resolved request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyModel {
    /// Description text.
    pub description: String,
    /// Body is required.
    pub required: bool,
    /// Request media types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MediaContentModel>,
}

impl RequestBodyModel {
    /// Resolves a request body (or a reference to one) located at `pointer`.
    pub fn new(parser: &OpenApiParser, body_or_ref: &Value, pointer: &str) -> AppResult<Self> {
        let (info, owner) = resolve_detached(parser, body_or_ref, pointer);
        let content = match info.get("content") {
            Some(content) => Some(MediaContentModel::new(
                parser,
                content,
                true,
                &pointer::join(&owner, ["content"]),
            )?),
            None => None,
        };
        Ok(Self {
            description: info
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: info.get("required").and_then(Value::as_bool).unwrap_or(false),
            content,
        })
    }
}

/// A resolved response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    /// Status code key.
    pub code: String,
    /// Status classification.
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    /// `x-summary`, or the description when no summary is given.
    pub summary: String,
    /// Description text, when `x-summary` holds the summary.
    pub description: String,
    /// Response headers.
    pub headers: Vec<FieldModel>,
    /// Response media types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MediaContentModel>,
}

impl ResponseModel {
    /// Resolves a response (or a reference to one) located at `pointer`.
    pub fn new(
        parser: &OpenApiParser,
        code: &str,
        response_type: ResponseType,
        response_or_ref: &Value,
        pointer: &str,
    ) -> AppResult<Self> {
        let (info, owner) = resolve_detached(parser, response_or_ref, pointer);
        let text = |key: &str| {
            info.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let (summary, description) = if info.contains_key("x-summary") {
            (text("x-summary"), text("description"))
        } else {
            (text("description"), String::new())
        };

        let mut headers = Vec::new();
        if let Some(Value::Object(declared)) = info.get("headers") {
            for (name, header) in declared {
                let mut header = as_schema_map(&parser.deref(header, false).value);
                header.insert("name".to_string(), Value::String(name.clone()));
                header.insert("in".to_string(), Value::String("header".to_string()));
                headers.push(FieldModel::from_parameter(
                    parser,
                    &Value::Object(header),
                    &pointer::join(&owner, ["headers", name.as_str()]),
                )?);
            }
        }

        let content = match info.get("content") {
            Some(content) => Some(MediaContentModel::new(
                parser,
                content,
                false,
                &pointer::join(&owner, ["content"]),
            )?),
            None => None,
        };

        Ok(Self {
            code: code.to_string(),
            response_type,
            summary,
            description,
            headers,
            content,
        })
    }
}

/// Dereferences `node` and releases the visit right away; returns the mapping
/// and the pointer its members live under.
fn resolve_detached(
    parser: &OpenApiParser,
    node: &Value,
    pointer: &str,
) -> (Map<String, Value>, String) {
    let resolved = parser.deref(node, false);
    let owner = resolved.reference().unwrap_or(pointer).to_string();
    (as_schema_map(&resolved.value), owner)
}

/// A resolved operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationModel {
    /// Pointer of the operation object.
    pub pointer: String,
    /// Path template, e.g. `/pets/{id}`.
    pub path: String,
    /// Lowercase HTTP method.
    pub http_verb: String,
    /// `operationId`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Summary, operation id, or the start of the description.
    pub name: String,
    /// Description text.
    pub description: String,
    /// Marked deprecated.
    pub deprecated: bool,
    /// Merged path and operation parameters.
    pub parameters: Vec<FieldModel>,
    /// Request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyModel>,
    /// Responses with a status code key, in document order.
    pub responses: Vec<ResponseModel>,
}

impl OperationModel {
    /// Resolves `method` on `path`.
    ///
    /// Fails when the path item or the operation is not declared.
    pub fn new(parser: &OpenApiParser, path: &str, method: &str) -> AppResult<Self> {
        let located = locate(parser, path, method)?;
        let operation = located.operation();
        let text = |key: &str| operation.get(key).and_then(Value::as_str).map(str::to_string);

        let parameters = merged_parameters(parser, &located)?;

        let request_body = match operation.get("requestBody") {
            Some(body) => Some(RequestBodyModel::new(
                parser,
                body,
                &pointer::join(&located.pointer, ["requestBody"]),
            )?),
            None => None,
        };

        let responses = match operation.get("responses").and_then(Value::as_object) {
            Some(declared) => {
                let responses_pointer = pointer::join(&located.pointer, ["responses"]);
                let has_success = declared
                    .keys()
                    .filter_map(|code| code.parse::<u16>().ok())
                    .any(|code| (100..=399).contains(&code));
                let mut responses = Vec::with_capacity(declared.len());
                for (code, response) in declared {
                    let Some(response_type) = status_code_type(code, has_success) else {
                        if code.parse::<u16>().is_ok() {
                            parser.warn(format!(
                                "Invalid HTTP status code \"{}\" at \"{}\", skipping",
                                code, responses_pointer
                            ));
                        }
                        continue;
                    };
                    responses.push(ResponseModel::new(
                        parser,
                        code,
                        response_type,
                        response,
                        &pointer::join(&responses_pointer, [code.as_str()]),
                    )?);
                }
                responses
            }
            None => Vec::new(),
        };

        let description = text("description");
        let operation_id = text("operationId");
        let name = text("summary")
            .or_else(|| operation_id.clone())
            .or_else(|| {
                description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .map(|d| d.chars().take(50).collect())
            })
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        Ok(Self {
            pointer: located.pointer.clone(),
            path: path.to_string(),
            http_verb: located.method.clone(),
            operation_id,
            name,
            description: description.unwrap_or_default(),
            deprecated: operation
                .get("deprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            parameters,
            request_body,
            responses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NormalizedOptions;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: T, version: "1"}
paths:
  /pets/{id}:
    parameters:
      - {name: id, in: path, required: true, schema: {type: string}}
      - {name: verbose, in: query, schema: {type: boolean}}
    get:
      parameters:
        - $ref: '#/components/parameters/Verbose'
        - {name: fields, in: query, schema: {type: array, items: {type: string}}}
        - {name: X-Trace, in: header, required: true, schema: {type: string}}
  /alias:
    $ref: '#/paths/~1pets~1{id}'
components:
  parameters:
    Verbose:
      name: verbose
      in: query
      description: Include details
      schema: {type: integer, enum: [0, 1]}
"#;

    fn names(fields: &[FieldModel]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_operation_overrides_path_parameter() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        let fields = resolve_operation_parameters(&p, "/pets/{id}", "GET").unwrap();
        assert_eq!(names(&fields), vec!["id", "verbose", "fields", "X-Trace"]);
        assert_eq!(fields[1].schema.schema_type, "integer");
        assert_eq!(fields[1].description, "Include details");
        assert_eq!(fields[2].schema.display_label(), "Array of string");
        assert_eq!(fields[0].schema.pointer, "#/paths/~1pets~1{id}/parameters/0/schema");
    }

    #[test]
    fn test_required_parameters_first() {
        let options = NormalizedOptions {
            required_props_first: true,
            ..NormalizedOptions::default()
        };
        let p = OpenApiParser::from_yaml(DOC, options).unwrap();
        let fields = resolve_operation_parameters(&p, "/pets/{id}", "get").unwrap();
        assert_eq!(names(&fields), vec!["id", "X-Trace", "verbose", "fields"]);
    }

    #[test]
    fn test_path_item_reference() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        let fields = resolve_operation_parameters(&p, "/alias", "get").unwrap();
        assert_eq!(fields.len(), 4);
    }

    const PETS: &str = r#"
openapi: 3.0.0
info: {title: T, version: "1"}
paths:
  /pets:
    post:
      operationId: addPet
      requestBody:
        $ref: '#/components/requestBodies/NewPet'
      responses:
        "201":
          description: Created
          headers:
            Location: {description: New resource, required: true, schema: {type: string}}
          content:
            application/json:
              schema: {$ref: '#/components/schemas/Pet'}
        "700": {description: Nonsense}
        default:
          x-summary: Failure
          description: Something went wrong
        x-extra: {}
    get:
      description: Lists every pet in the store, optionally filtered by tag and paginated.
      responses:
        default: {description: Anything}
components:
  requestBodies:
    NewPet:
      description: Pet to add
      required: true
      content:
        application/json:
          schema: {$ref: '#/components/schemas/Pet'}
  schemas:
    Pet:
      type: object
      properties:
        id: {type: integer, readOnly: true}
        name: {type: string}
"#;

    #[test]
    fn test_operation_body_and_responses() {
        let p = OpenApiParser::from_yaml(PETS, NormalizedOptions::default()).unwrap();
        let op = OperationModel::new(&p, "/pets", "post").unwrap();
        assert_eq!(op.name, "addPet");
        assert_eq!(op.pointer, "#/paths/~1pets/post");

        let body = op.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.description, "Pet to add");
        let media = body.content.as_ref().unwrap().active().unwrap();
        assert!(media.is_request_type);
        assert_eq!(media.sample_fields().len(), 1);
        assert_eq!(
            media.schema.as_ref().unwrap().pointer,
            "#/components/schemas/Pet"
        );

        let codes: Vec<&str> = op.responses.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["201", "default"]);
        let created = &op.responses[0];
        assert_eq!(created.response_type, ResponseType::Success);
        assert_eq!(created.summary, "Created");
        assert_eq!(created.headers[0].name, "Location");
        assert_eq!(created.headers[0].location.as_deref(), Some("header"));
        assert!(created.headers[0].required);
        let media = created.content.as_ref().unwrap().active().unwrap();
        assert!(!media.is_request_type);
        assert!(media.sample_flags.skip_write_only);
        assert_eq!(media.sample_fields().len(), 2);

        let failure = &op.responses[1];
        assert_eq!(failure.response_type, ResponseType::Error);
        assert_eq!(failure.summary, "Failure");
        assert_eq!(failure.description, "Something went wrong");

        assert_eq!(p.warnings().len(), 1);
        assert!(p.warnings()[0].contains("\"700\""));
    }

    #[test]
    fn test_default_response_without_success_is_success() {
        let p = OpenApiParser::from_yaml(PETS, NormalizedOptions::default()).unwrap();
        let op = OperationModel::new(&p, "/pets", "get").unwrap();
        assert_eq!(op.responses[0].response_type, ResponseType::Success);
        assert!(op.request_body.is_none());
        assert_eq!(op.name.chars().count(), 50);
        assert!(op.description.starts_with(&op.name));
    }

    #[test]
    fn test_status_code_type() {
        assert_eq!(status_code_type("101", false), Some(ResponseType::Info));
        assert_eq!(status_code_type("302", false), Some(ResponseType::Redirect));
        assert_eq!(status_code_type("503", false), Some(ResponseType::Error));
        assert_eq!(status_code_type("default", true), Some(ResponseType::Error));
        assert_eq!(status_code_type("99", false), None);
        assert_eq!(status_code_type("x-foo", false), None);
    }

    #[test]
    fn test_list_operations_in_document_order() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        assert_eq!(
            list_operations(&p),
            vec![
                ("/pets/{id}".to_string(), "get".to_string()),
                ("/alias".to_string(), "get".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_operation_is_an_error() {
        let p = OpenApiParser::from_yaml(DOC, NormalizedOptions::default()).unwrap();
        assert!(resolve_operation_parameters(&p, "/pets/{id}", "post").is_err());
        assert!(resolve_operation_parameters(&p, "/nowhere", "get").is_err());
        assert!(resolve_operation_parameters(&p, "/pets/{id}", "fetch").is_err());
    }
}
