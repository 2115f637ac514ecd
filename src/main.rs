//! OpenAPI to SDK - Command-line tool for generating typed API clients.
//!
//! This binary reads an OpenAPI 3 document (JSON or YAML, from disk or over HTTP) and writes a
//! TypeScript SDK: Zod validators for every named schema, one request function per operation
//! arranged in a module tree that mirrors the URL paths, and an alias per operationId.
//!
//! # Usage
//!
//! ```bash
//! openapi-to-sdk --input <PATH_OR_URL> --output <DIR> [--import-prefix <.js|.ts|false>]
//! ```
//!
//! # Examples
//!
//! Generate an SDK from a local document:
//! ```bash
//! openapi-to-sdk -i petstore.yaml -o ./petstore-sdk
//! ```
//!
//! Generate from a URL, for a runtime that executes TypeScript directly:
//! ```bash
//! openapi-to-sdk -i https://petstore3.swagger.io/api/v3/openapi.json -o ./sdk -p .ts
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-to-sdk -i petstore.yaml -o ./sdk -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;

use openapi_to_sdk::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI to SDK starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    info!("SDK generation completed successfully");

    Ok(())
}
