use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CrashError {
    #[error("unknown region code: {0}")]
    UnknownRegion(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("server returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("failed to parse listing page: {0}")]
    Listing(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("archive error in {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("failed to write cache file {path}: {message}")]
    CacheEncode { path: PathBuf, message: String },

    #[error("failed to read cache file {path}: {message}")]
    #[diagnostic(help("delete the file to force a fresh parse"))]
    CacheDecode { path: PathBuf, message: String },

    #[error("column not found: {0}")]
    MissingColumn(String),

    #[error("column {column} has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("tables do not share a schema: {0}")]
    SchemaMismatch(String),

    #[error("failed to write figure: {0}")]
    Figure(String),
}
