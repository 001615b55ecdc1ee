//! Error type shared by the library modules.
//!
//! The binary wraps these in [`anyhow`] with extra context; library callers
//! can match on the variant to tell a missing document from a broken
//! connection.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The data source has no document under this identity.
    #[error("document not found: doctype {doctype}, docid {docid}")]
    NotFound { doctype: u64, docid: u64 },

    /// A markup source file could not be parsed.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was called before the state it depends on was supplied.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A required input file does not exist.
    #[error("missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
