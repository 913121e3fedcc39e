#![deny(missing_docs)]

//! # Operations Command
//!
//! Resolves operations (parameters, request body, responses) and prints them as JSON.

use apidoc_core::{list_operations, OpenApiParser, OperationModel};
use serde_json::{json, Map, Value};

use crate::document::DocumentArgs;
use crate::error::CliResult;

/// Arguments for the operations command.
#[derive(clap::Args, Debug, Clone)]
pub struct OperationsArgs {
    /// Document and options.
    #[clap(flatten)]
    pub document: DocumentArgs,

    /// Only operations on this path template, e.g. `/pets/{id}`.
    #[clap(long)]
    pub path: Option<String>,

    /// Only operations with this HTTP method.
    #[clap(long)]
    pub method: Option<String>,

    /// Pretty-print the output.
    #[clap(long)]
    pub pretty: bool,
}

/// Executes the operations workflow.
pub fn execute(args: &OperationsArgs) -> CliResult<()> {
    let parser = args.document.load()?;
    let output = render(&parser, args.path.as_deref(), args.method.as_deref())?;
    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

/// Resolves matching operations into `{"operations", "errors", "warnings"}`.
///
/// Errors are keyed by `"METHOD path"`.
pub fn render(parser: &OpenApiParser, path: Option<&str>, method: Option<&str>) -> CliResult<Value> {
    let mut operations = Vec::new();
    let mut errors = Map::new();
    for (op_path, op_method) in list_operations(parser) {
        if path.is_some_and(|p| p != op_path) {
            continue;
        }
        if method.is_some_and(|m| !m.eq_ignore_ascii_case(&op_method)) {
            continue;
        }
        match OperationModel::new(parser, &op_path, &op_method) {
            Ok(model) => operations.push(serde_json::to_value(&model)?),
            Err(e) => {
                let key = format!("{} {}", op_method.to_ascii_uppercase(), op_path);
                tracing::error!("{}: {}", key, e);
                errors.insert(key, Value::String(e.to_string()));
            }
        }
    }
    Ok(json!({
        "operations": operations,
        "errors": errors,
        "warnings": parser.take_warnings(),
    }))
}
