#![deny(missing_docs)]

//! # apidoc CLI
//!
//! Command Line Interface for the OpenAPI schema resolution engine.
//!
//! Supported Commands:
//! - `resolve`: Prints resolved schema trees as JSON.
//! - `operations`: Prints resolved operations as JSON.
//! - `schemas`: Lists the named schema definitions.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;

mod document;
mod error;
mod operations;
mod resolve;
mod schemas;

#[derive(Parser, Debug)]
#[clap(author, version, about = "OpenAPI schema resolution CLI")]
struct Cli {
    /// Log debug diagnostics (overridden by `RUST_LOG`).
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve schemas into display-ready trees.
    Resolve(resolve::ResolveArgs),
    /// Resolve operations with their parameters, request bodies and responses.
    Operations(operations::OperationsArgs),
    /// List named schema definitions.
    Schemas(schemas::SchemasArgs),
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Resolve(args) => resolve::execute(args)?,
        Commands::Operations(args) => operations::execute(args)?,
        Commands::Schemas(args) => schemas::execute(args)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve_arguments() {
        let cli = Cli::try_parse_from([
            "apidoc",
            "resolve",
            "api.yaml",
            "-p",
            "#/components/schemas/Pet",
            "--pointer",
            "#/components/schemas/Dog",
            "--required-props-first",
        ])
        .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.pointers.len(), 2);
                assert!(args.document.required_props_first);
                assert!(!args.all);
            }
            _ => panic!("expected resolve"),
        }
    }
}
