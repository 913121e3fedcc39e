#![deny(missing_docs)]

//! # Document Loading
//!
//! Shared arguments for commands that operate on one OpenAPI document.

use std::fs;
use std::path::PathBuf;

use apidoc_core::{NormalizedOptions, OpenApiParser, RawOptions};

use crate::error::{CliError, CliResult};

/// Arguments locating the document and its resolution options.
#[derive(clap::Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Path to the OpenAPI document (YAML or JSON).
    pub spec: PathBuf,

    /// Options file (YAML or JSON object, e.g. `requiredPropsFirst: true`).
    #[clap(long, env = "APIDOC_OPTIONS")]
    pub options: Option<PathBuf>,

    /// List required fields first.
    #[clap(long, env = "APIDOC_REQUIRED_PROPS_FIRST")]
    pub required_props_first: bool,

    /// Sort fields alphabetically.
    #[clap(long, env = "APIDOC_SORT_PROPS_ALPHABETICALLY")]
    pub sort_props_alphabetically: bool,
}

impl DocumentArgs {
    /// Options from the options file, with command line flags applied on top.
    pub fn resolve_options(&self) -> CliResult<NormalizedOptions> {
        let raw = match &self.options {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    CliError::General(format!("Failed to read options {:?}: {}", path, e))
                })?;
                RawOptions::from_yaml(&text)?
            }
            None => RawOptions::default(),
        };
        let mut options = NormalizedOptions::from(raw);
        options.required_props_first |= self.required_props_first;
        options.sort_props_alphabetically |= self.sort_props_alphabetically;
        Ok(options)
    }

    /// Reads and validates the document.
    pub fn load(&self) -> CliResult<OpenApiParser> {
        if !self.spec.exists() {
            return Err(CliError::General(format!(
                "OpenAPI file not found: {:?}",
                self.spec
            )));
        }
        let options = self.resolve_options()?;
        let text = fs::read_to_string(&self.spec)?;
        let is_json = self
            .spec
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parser = if is_json {
            OpenApiParser::from_json(&text, options)?
        } else {
            OpenApiParser::from_yaml(&text, options)?
        };
        tracing::debug!("Loaded {:?}", self.spec);
        Ok(parser)
    }
}
