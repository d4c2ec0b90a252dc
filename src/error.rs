use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CovarError {
    #[error("invalid key field: {0} (expected lineage or label)")]
    InvalidKeyField(String),

    #[error("empty search key")]
    EmptyKey,

    #[error("{0}")]
    NotFound(String),

    #[error("variant store unavailable: {0}")]
    #[diagnostic(help("check that the database file exists and contains the covar table"))]
    StoreUnavailable(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("mutation chart not found: {0}")]
    ChartMissing(String),

    #[error("spreadsheet export failed: {0}")]
    Export(String),

    #[error("spreadsheet read failed: {0}")]
    SheetRead(String),
}
