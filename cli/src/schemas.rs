#![deny(missing_docs)]

//! # Schemas Command
//!
//! Lists the named definitions of a document with their pointers.

use apidoc_core::oas::pointer;
use apidoc_core::OpenApiParser;

use crate::document::DocumentArgs;
use crate::error::CliResult;

/// Arguments for the schemas command.
#[derive(clap::Args, Debug, Clone)]
pub struct SchemasArgs {
    /// Document and options.
    #[clap(flatten)]
    pub document: DocumentArgs,
}

/// Executes the listing.
pub fn execute(args: &SchemasArgs) -> CliResult<()> {
    let parser = args.document.load()?;
    for line in listing(&parser) {
        println!("{}", line);
    }
    Ok(())
}

/// One `name<TAB>pointer` line per definition.
pub fn listing(parser: &OpenApiParser) -> Vec<String> {
    parser
        .named_schemas()
        .into_iter()
        .map(|name| {
            let ptr = pointer::join("#/components/schemas", [name.as_str()]);
            format!("{}\t{}", name, ptr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_listing_escapes_names() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        fs::write(
            &spec,
            r#"
openapi: 3.1.0
info: {title: T, version: "1"}
components:
  schemas:
    Pet: {type: object}
    a/b: {type: string}
"#,
        )
        .unwrap();
        let args = SchemasArgs {
            document: DocumentArgs {
                spec,
                options: None,
                required_props_first: false,
                sort_props_alphabetically: false,
            },
        };
        let parser = args.document.load().unwrap();
        assert_eq!(
            listing(&parser),
            vec![
                "Pet\t#/components/schemas/Pet".to_string(),
                "a/b\t#/components/schemas/a~1b".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        fs::write(&spec, "info: {title: T}\n").unwrap();
        let args = SchemasArgs {
            document: DocumentArgs {
                spec,
                options: None,
                required_props_first: false,
                sort_props_alphabetically: false,
            },
        };
        assert!(execute(&args).is_err());
    }
}
