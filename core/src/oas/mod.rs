#![deny(missing_docs)]

//! # OpenAPI Schema Resolution
//!
//! - **pointer**: JSON Pointer building and lookup.
//! - **ref_counter**: In-flight `$ref` tracking for cycle detection.
//! - **parser**: Document owner; dereferencing, `allOf` merging, derived types.
//! - **classify**: Type inference and human readable constraints.
//! - **schema**: Resolved schema tree.
//! - **field**: Object members and parameters.
//! - **media**: Request and response payloads per media type.
//! - **operation**: Parameters, request body and responses of a single operation.

pub mod classify;
pub mod field;
pub mod media;
pub mod operation;
pub mod parser;
pub mod pointer;
pub mod ref_counter;
pub mod schema;

pub use field::{FieldInfo, FieldKind, FieldModel, ADDITIONAL_PROPERTIES_NAME};
pub use media::{ExampleModel, MediaContentModel, MediaTypeModel};
pub use operation::{
    list_operations, resolve_operation_parameters, OperationModel, RequestBodyModel, ResponseModel,
    ResponseType,
};
pub use parser::{Dereferenced, MergedSchema, OpenApiParser, CIRCULAR_MARKER};
pub use ref_counter::{RefCounter, RefGuard};
pub use schema::SchemaModel;
