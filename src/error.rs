use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MafError {
    #[error("input must be a valid GDC manifest: {0}")]
    #[diagnostic(help("download a manifest from https://portal.gdc.cancer.gov/"))]
    InvalidManifest(String),

    #[error("query produced no results")]
    EmptyResult,

    #[error("must choose either a manifest or a project, not both")]
    ConflictingInput,

    #[error("no selection given, use --manifest or --project")]
    MissingInput,

    #[error("GDC request failed: {0}")]
    TransferError(String),

    #[error("GDC returned status {status}: {message}")]
    TransferStatus { status: u16, message: String },

    #[error("maximum retries exceeded for file {file_id} after {attempts} attempts")]
    MaxRetriesExceeded { file_id: String, attempts: usize },

    #[error("expected md5sum {expected} does not match {actual} for {file_name}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    #[error("malformed header line {line} in {file}: {content}")]
    MalformedHeader {
        file: String,
        line: usize,
        content: String,
    },

    #[error("column schema mismatch in {file}: {detail}")]
    SchemaMismatch { file: String, detail: String },

    #[error("download of {0} carried no usable content-disposition file name")]
    MissingContentDisposition(String),

    #[error("failed to decode {file}: {message}")]
    Decode { file: String, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
