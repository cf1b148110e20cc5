use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("unknown sample type(s): {}", .0.join(", "))]
    #[diagnostic(
        code(gdc_catalog::vocabulary),
        help("add the sample type(s) to the vocabulary before building the catalog")
    )]
    UnknownSampleType(Vec<String>),

    #[error("failed to read table {path}: {message}")]
    TableRead { path: String, message: String },

    #[error("malformed row at line {line} of {path}: {message}")]
    TableParse {
        path: String,
        line: u64,
        message: String,
    },

    #[error("failed to write catalog: {0}")]
    TableWrite(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to parse GDC response: {0}")]
    GdcResponse(String),

    #[error("GDC request failed: {0}")]
    GdcHttp(String),

    #[error("GDC returned status {status}: {message}")]
    GdcStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
