use pixelscan_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal batch-level failures. Per-domain failures never surface here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no url column (expected one of: url, domain, website)")]
    MissingUrlColumn,

    #[error("cannot write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Checkpoint persistence failures. Logged; the batch carries on.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt checkpoint: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("incompatible checkpoint version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("checkpoint belongs to batch {found}, not {expected}")]
    BatchMismatch { found: String, expected: String },
}

pub type Result<T> = std::result::Result<T, BatchError>;
