use thiserror::Error;

/// Result type alias for the generator core
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the generator
///
/// Every variant is fatal: the run stops at the first one and no partial output is kept.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch OpenAPI document from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("OpenAPI document file not found: {0}")]
    NotFound(String),

    #[error("failed to parse OpenAPI document as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse OpenAPI document as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("OpenAPI document is empty")]
    EmptyDocument,

    #[error("missing \"{0}\" field")]
    MissingField(&'static str),

    #[error("invalid import prefix {0:?}: must be \".js\", \".ts\", or false")]
    InvalidImportPrefix(String),

    #[error("unsupported reference {reference} at {location}: only #/components/schemas/* is supported")]
    UnsupportedReference { reference: String, location: String },

    #[error("unresolved schema reference {name} at {location}")]
    UnresolvedReference { name: String, location: String },

    #[error("duplicate operationId {operation_id}: declared by {first} and {second}")]
    DuplicateOperationId {
        operation_id: String,
        first: String,
        second: String,
    },

    #[error("symbol {symbol} is declared twice in {path}")]
    SymbolCollision { path: String, symbol: String },

    #[error("invalid path segment {segment:?} in {path}")]
    InvalidPathSegment { segment: String, path: String },

    #[error("two artifacts target the same path: {0}")]
    ArtifactPathCollision(String),
}
