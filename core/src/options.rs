#![deny(missing_docs)]

//! # Resolution Options
//!
//! Raw options arrive from an embedding configuration (JSON/YAML object or
//! attribute-like strings) and are normalized once into plain booleans.

use crate::error::AppResult;
use serde::{Deserialize, Serialize};

/// A boolean option as written by the user.
///
/// A present string (including `""` and `"false"`) counts as enabled, the same
/// way an HTML boolean attribute does.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Explicit boolean.
    Bool(bool),
    /// Attribute-style string value.
    Text(String),
}

impl FlagValue {
    fn enabled(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Text(_) => true,
        }
    }
}

fn flag(value: &Option<FlagValue>) -> bool {
    value.as_ref().map(FlagValue::enabled).unwrap_or(false)
}

/// Options as supplied by the embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    /// Move required fields before optional ones.
    #[serde(default)]
    pub required_props_first: Option<FlagValue>,
    /// Sort fields alphabetically by name.
    #[serde(default)]
    pub sort_props_alphabetically: Option<FlagValue>,
    /// Sample generators should only emit required fields.
    #[serde(default)]
    pub only_required_in_samples: Option<FlagValue>,
    /// Ignore media type parameters when matching content types.
    #[serde(default, rename = "unstable_ignoreMimeParameters")]
    pub unstable_ignore_mime_parameters: Option<FlagValue>,
}

impl RawOptions {
    /// Parses raw options from a YAML (or JSON) string.
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Flags threaded to sample / media consumers of a resolved schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleFlags {
    /// Hide `readOnly` members (request bodies).
    pub skip_read_only: bool,
    /// Hide `writeOnly` members (responses).
    pub skip_write_only: bool,
    /// Hide members that are not required.
    pub only_required: bool,
}

/// Normalized options consulted during resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedOptions {
    /// Reorder fields so that required ones come first.
    pub required_props_first: bool,
    /// Sort fields alphabetically before any required-first reordering.
    pub sort_props_alphabetically: bool,
    /// Only required fields appear in generated samples.
    pub only_required_in_samples: bool,
    /// Merge media types that differ only in their parameters.
    pub unstable_ignore_mime_parameters: bool,
}

impl NormalizedOptions {
    /// Sample flags for a request (`true`) or response (`false`) context.
    pub fn sample_flags(&self, is_request: bool) -> SampleFlags {
        SampleFlags {
            skip_read_only: is_request,
            skip_write_only: !is_request,
            only_required: self.only_required_in_samples,
        }
    }
}

impl From<&RawOptions> for NormalizedOptions {
    fn from(raw: &RawOptions) -> Self {
        Self {
            required_props_first: flag(&raw.required_props_first),
            sort_props_alphabetically: flag(&raw.sort_props_alphabetically),
            only_required_in_samples: flag(&raw.only_required_in_samples),
            unstable_ignore_mime_parameters: flag(&raw.unstable_ignore_mime_parameters),
        }
    }
}

impl From<RawOptions> for NormalizedOptions {
    fn from(raw: RawOptions) -> Self {
        Self::from(&raw)
    }
}
