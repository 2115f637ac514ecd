use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use crate::emitter::{generate_sdk, GeneratorOptions};
use crate::loader::load_document;
use crate::printer::ImportSuffix;
use crate::writer::write_artifacts;

/// OpenAPI to SDK - Generate a typed TypeScript client with Zod validators from an OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "openapi-to-sdk")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path or http(s) URL of the OpenAPI document (JSON or YAML)
    #[arg(short = 'i', long = "input", value_name = "PATH_OR_URL")]
    pub input: String,

    /// Directory the SDK is written to
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// Suffix of relative imports in the generated code (.js, .ts, or false for none)
    #[arg(
        short = 'p',
        long = "import-prefix",
        value_name = "SUFFIX",
        default_value = ".js",
        value_parser = parse_import_suffix
    )]
    pub import_prefix: ImportSuffix,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if args.input.trim().is_empty() {
        anyhow::bail!("Input must not be empty");
    }

    if args.output.is_file() {
        anyhow::bail!(
            "Output path is a file, expected a directory: {}",
            args.output.display()
        );
    }

    info!("Input: {}", args.input);
    info!("Output directory: {}", args.output.display());
    info!("Import suffix: {}", args.import_prefix);

    Ok(args)
}

fn parse_import_suffix(value: &str) -> Result<ImportSuffix, String> {
    value.parse().map_err(|e: crate::error::Error| e.to_string())
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let options = GeneratorOptions {
        import_suffix: args.import_prefix,
    };

    info!("Starting SDK generation...");

    // Step 1: Load the document
    info!("Loading OpenAPI document...");
    let document = load_document(&args.input)
        .with_context(|| format!("Failed to load OpenAPI document from {}", args.input))?;

    // Step 2: Generate artifacts
    info!("Generating SDK for {} v{}...", document.info.title, document.info.version);
    let artifacts = generate_sdk(&document, &options).context("Failed to generate SDK")?;

    // Step 3: Write them out
    let written = write_artifacts(&artifacts, &args.output)?;

    // Step 4: Display summary
    let count = |prefix: &str| {
        artifacts
            .iter()
            .filter(|artifact| artifact.path.starts_with(prefix))
            .count()
    };
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Schema files: {}", count("schemas/"));
    info!("  - Route files: {}", count("routes/"));
    info!("  - Files written: {}", written.len());
    info!("  - Output: {}", args.output.display());

    Ok(())
}
