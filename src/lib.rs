//! OpenAPI to SDK - Typed TypeScript clients generated from OpenAPI documents.
//!
//! This library turns an OpenAPI 3 document into the source files of a client SDK: a Zod
//! validator and inferred type per named schema, a request function per operation arranged in
//! a module tree that mirrors the URL paths, and an alias table keyed by operationId.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`loader`] - Reads the document from disk or over HTTP and parses JSON or YAML
//! 2. [`document`] - Serde model of the parts of the document the generator consumes
//! 3. [`schema`] - Lowers schema descriptions into [`schema::SchemaNode`]s and the registry
//! 4. [`operation`] - Flattens path items into a list of operations
//! 5. [`compiler`] - Compiles schema nodes into validator expressions and their dependencies
//! 6. [`route_tree`] - Builds the route module tree, synthesizing missing ancestors
//! 7. [`alias`] - Maps operation identifiers to their request functions
//! 8. [`artifact`] - Structured model of the generated modules
//! 9. [`emitter`] - Plans every module of the SDK
//! 10. [`printer`] - Renders modules into TypeScript source
//! 11. [`writer`] - Writes the generated files to disk
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_to_sdk::{
//!     emitter::{generate_sdk, GeneratorOptions},
//!     loader::load_document,
//!     printer::ImportSuffix,
//!     writer::write_artifacts,
//! };
//! use std::path::Path;
//!
//! // Load the document
//! let document = load_document("./petstore.yaml").unwrap();
//!
//! // Generate the SDK in memory
//! let options = GeneratorOptions {
//!     import_suffix: ImportSuffix::Js,
//! };
//! let artifacts = generate_sdk(&document, &options).unwrap();
//!
//! // Write it out
//! write_artifacts(&artifacts, Path::new("./petstore-sdk")).unwrap();
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod alias;
pub mod artifact;
pub mod cli;
pub mod compiler;
pub mod document;
pub mod emitter;
pub mod error;
pub mod loader;
pub mod operation;
pub mod printer;
pub mod route_tree;
pub mod schema;
pub mod writer;

pub use emitter::{generate_sdk, GeneratorOptions};
pub use error::{Error, Result};
