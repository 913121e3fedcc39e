#![deny(missing_docs)]

//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the workspace.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// The document text could not be deserialized (YAML or JSON).
    #[from(ignore)]
    #[display("Parse Error: {_0}")]
    Parse(String),

    /// The document lacks a required top-level marker and cannot be resolved at all.
    #[from(ignore)]
    #[display("Invalid Document: {_0}")]
    InvalidDocument(String),

    /// `allOf` branches declare different `type` values.
    #[from(ignore)]
    #[display("Incompatible types in allOf at \"{pointer}\"")]
    IncompatibleAllOfTypes {
        /// Pointer of the schema whose `allOf` could not be merged.
        pointer: String,
    },

    /// A pointer did not address any node of the document.
    ///
    /// Only surfaces from the raw pointer API; the parser swallows it.
    #[from(ignore)]
    #[display("Pointer not found: {_0}")]
    PointerNotFound(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_all_of_conflict_names_pointer() {
        let err = AppError::IncompatibleAllOfTypes {
            pointer: "#/components/schemas/Broken".into(),
        };
        assert_eq!(
            err.to_string(),
            "Incompatible types in allOf at \"#/components/schemas/Broken\""
        );
    }

    #[test]
    fn test_yaml_error_becomes_parse() {
        let err = serde_yaml::from_str::<serde_json::Value>("a: [1, 2").unwrap_err();
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Parse(_)));
    }
}
