//! Error types for trace triage
//!
//! Only configuration-level problems are fatal. Per-source and per-trace
//! problems are counted in the pipeline reports instead of surfacing here.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors for a triage run
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No 'nodes' directory found in {0}")]
    MissingNodesDir(PathBuf),

    #[error("Refusing to clear {0}: it is not empty and holds no earlier triage output")]
    ForeignOutputDir(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source that could not be read; skipped, never fatal
#[derive(Error, Debug)]
#[error("Could not read {source_id}: {reason}")]
pub struct SourceError {
    pub source_id: String,
    pub reason: String,
}
