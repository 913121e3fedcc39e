#![deny(missing_docs)]

//! # Resolve Command
//!
//! Builds the resolved schema trees of selected pointers and prints them as JSON.
//!
//! A subtree whose `allOf` members conflict is reported under `errors`
//! instead of aborting the whole run.

use apidoc_core::oas::pointer;
use apidoc_core::OpenApiParser;
use serde_json::{json, Map, Value};

use crate::document::DocumentArgs;
use crate::error::{CliError, CliResult};

/// Arguments for the resolve command.
#[derive(clap::Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Document and options.
    #[clap(flatten)]
    pub document: DocumentArgs,

    /// Pointer to resolve (repeatable), e.g. `#/components/schemas/Pet`.
    #[clap(long = "pointer", short = 'p')]
    pub pointers: Vec<String>,

    /// Resolve every `components/schemas` definition.
    #[clap(long)]
    pub all: bool,

    /// Pretty-print the output.
    #[clap(long)]
    pub pretty: bool,
}

/// Executes the resolve workflow.
pub fn execute(args: &ResolveArgs) -> CliResult<()> {
    let parser = args.document.load()?;
    let output = render(&parser, &selected_pointers(args, &parser)?)?;
    let text = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}

fn selected_pointers(args: &ResolveArgs, parser: &OpenApiParser) -> CliResult<Vec<String>> {
    let mut pointers = args.pointers.clone();
    if args.all {
        pointers.extend(
            parser
                .named_schemas()
                .iter()
                .map(|name| pointer::join("#/components/schemas", [name.as_str()])),
        );
    }
    if pointers.is_empty() {
        return Err(CliError::General(
            "Nothing to resolve: pass --pointer or --all".to_string(),
        ));
    }
    Ok(pointers)
}

/// Resolves each pointer into `{"schemas", "errors", "warnings"}`.
pub fn render(parser: &OpenApiParser, pointers: &[String]) -> CliResult<Value> {
    let mut schemas = Map::new();
    let mut errors = Map::new();
    for ptr in pointers {
        match parser.resolve_schema(ptr) {
            Ok(model) => {
                schemas.insert(ptr.clone(), serde_json::to_value(&model)?);
            }
            Err(e) => {
                tracing::error!("{}: {}", ptr, e);
                errors.insert(ptr.clone(), Value::String(e.to_string()));
            }
        }
    }
    Ok(json!({
        "schemas": schemas,
        "errors": errors,
        "warnings": parser.take_warnings(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const DOC: &str = r#"
openapi: 3.0.0
info: {title: T, version: "1"}
components:
  schemas:
    Node:
      type: object
      required: [id]
      properties:
        label: {type: string}
        id: {type: integer}
        next: {$ref: '#/components/schemas/Node'}
    Broken:
      allOf:
        - type: string
        - type: object
"#;

    fn args(spec: PathBuf) -> ResolveArgs {
        ResolveArgs {
            document: DocumentArgs {
                spec,
                options: None,
                required_props_first: false,
                sort_props_alphabetically: false,
            },
            pointers: vec![],
            all: false,
            pretty: false,
        }
    }

    #[test]
    fn test_render_all_schemas() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        fs::write(&spec, DOC).unwrap();

        let mut args = args(spec);
        args.all = true;
        let parser = args.document.load().unwrap();
        let pointers = selected_pointers(&args, &parser).unwrap();
        assert_eq!(
            pointers,
            vec!["#/components/schemas/Node", "#/components/schemas/Broken"]
        );

        let output = render(&parser, &pointers).unwrap();
        let node = &output["schemas"]["#/components/schemas/Node"];
        assert_eq!(node["title"], "Node");
        assert_eq!(node["fields"][2]["schema"]["isCircular"], true);
        assert!(output["errors"]["#/components/schemas/Broken"]
            .as_str()
            .unwrap()
            .contains("Incompatible types in allOf"));
        assert_eq!(output["warnings"], json!([]));
    }

    #[test]
    fn test_cli_flags_override_options_file() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("api.json");
        let as_json: Value = serde_yaml::from_str(DOC).unwrap();
        fs::write(&spec, serde_json::to_string(&as_json).unwrap()).unwrap();
        let options = dir.path().join("options.yaml");
        fs::write(&options, "sortPropsAlphabetically: true\n").unwrap();

        let mut args = args(spec);
        args.document.options = Some(options);
        args.document.required_props_first = true;
        let parser = args.document.load().unwrap();
        assert!(parser.options().sort_props_alphabetically);
        assert!(parser.options().required_props_first);

        let output = render(&parser, &["#/components/schemas/Node".to_string()]).unwrap();
        let names: Vec<&str> = output["schemas"]["#/components/schemas/Node"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["id", "label", "next"]);
    }

    #[test]
    fn test_nothing_selected_is_an_error() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        fs::write(&spec, DOC).unwrap();
        assert!(execute(&args(spec)).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut args = args(PathBuf::from("does/not/exist.yaml"));
        args.all = true;
        assert!(execute(&args).is_err());
    }
}
