use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TaxoError {
    #[error("invalid accession: {0:?}")]
    InvalidAccession(String),

    #[error("failed to read table {path}: {message}")]
    TableRead { path: String, message: String },

    #[error("column {column:?} not found in table (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("InterPro request failed: {0}")]
    Http(String),

    #[error("InterPro returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("gave up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("failed to decode JSON: {0}")]
    Decode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
