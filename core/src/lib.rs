#![deny(missing_docs)]

//! # apidoc Core
//!
//! Resolves the schemas of a loaded OpenAPI document into cycle-safe,
//! display-ready trees: `$ref` dereferencing, `allOf` merging,
//! `oneOf`/`anyOf` alternatives and discriminator-derived types.

/// Shared error types.
pub mod error;

/// Resolution options.
pub mod options;

/// OpenAPI (OAS) schema resolution.
pub mod oas;

pub use error::{AppError, AppResult};
pub use oas::{
    list_operations, resolve_operation_parameters, FieldKind, FieldModel, MediaContentModel,
    MediaTypeModel, OpenApiParser, OperationModel, SchemaModel,
};
pub use options::{NormalizedOptions, RawOptions, SampleFlags};
