//! Loads an OpenAPI document from a file path or URL.
//!
//! The input format is chosen from the input name: anything ending in `.json` is parsed as
//! JSON, everything else as YAML. Required top-level fields are checked before the document
//! is handed to the generator.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::{OpenApiDocument, RawDocument};
use crate::error::{Error, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Serialization format of the input document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from the input path or URL
    pub fn from_input(input: &str) -> Self {
        if input.to_lowercase().ends_with(".json") {
            DocumentFormat::Json
        } else {
            DocumentFormat::Yaml
        }
    }
}

/// Load, parse and validate a document from a path or an `http(s)://` URL.
pub fn load_document(input: &str) -> Result<OpenApiDocument> {
    let content = if is_url(input) {
        fetch(input)?
    } else {
        read(input)?
    };

    let format = DocumentFormat::from_input(input);
    debug!("Parsing {} as {:?}", input, format);
    parse_document(&content, format)
}

/// Parse document text and check its required top-level fields.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<OpenApiDocument> {
    if content.trim().is_empty() {
        return Err(Error::EmptyDocument);
    }

    let raw: Option<RawDocument> = match format {
        DocumentFormat::Json => serde_json::from_str(content)?,
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
    };
    let raw = raw.ok_or(Error::EmptyDocument)?;

    let openapi = raw.openapi.ok_or(Error::MissingField("openapi"))?;
    let info = raw.info.ok_or(Error::MissingField("info"))?;
    let paths = raw.paths.ok_or(Error::MissingField("paths"))?;

    info!("Loaded {} v{} (OpenAPI {})", info.title, info.version, openapi);

    Ok(OpenApiDocument {
        openapi,
        info,
        servers: raw.servers,
        paths,
        components: raw.components,
    })
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn read(input: &str) -> Result<String> {
    let path = Path::new(input);
    let resolved: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if !resolved.exists() {
        return Err(Error::NotFound(resolved.display().to_string()));
    }

    info!("Reading OpenAPI document from {}", resolved.display());
    Ok(fs::read_to_string(&resolved)?)
}

fn fetch(url: &str) -> Result<String> {
    info!("Fetching OpenAPI document from {}", url);
    let fetch_error = |message: String| Error::Fetch {
        url: url.to_string(),
        message,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_error(response.status().to_string()));
    }

    response.text().map_err(|e| fetch_error(e.to_string()))
}
