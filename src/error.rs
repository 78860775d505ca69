//! Error types shared across the pipeline stages.
//!
//! Acquisition failures are fatal and bubble up to the caller. Column gaps
//! are not errors at all: they travel as [`SchemaGap`] inside
//! [`crate::analyzers::types::Availability::Unavailable`].

use polars::prelude::PolarsError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while making the raw dataset available on disk.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("corrupt archive {}: {reason}", archive.display())]
    CorruptArchive { archive: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AcquireError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AcquireError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures inside the modeling engine.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("model not fitted")]
    NotFitted,

    #[error("singular system while solving for coefficients")]
    Singular,

    #[error("frame error: {0}")]
    Data(#[from] PolarsError),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// An output that could not be produced because columns are missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaGap {
    pub output: &'static str,
    pub missing: Vec<String>,
}

impl SchemaGap {
    pub fn new(output: &'static str, missing: Vec<String>) -> Self {
        Self { output, missing }
    }

    /// The columns exist but no usable rows remain.
    pub fn no_rows(output: &'static str) -> Self {
        Self::new(output, Vec::new())
    }
}

impl fmt::Display for SchemaGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.missing.is_empty() {
            return write!(f, "{} skipped: no usable rows", self.output);
        }
        write!(
            f,
            "{} skipped: missing column(s) {}",
            self.output,
            self.missing.join(", ")
        )
    }
}
