use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::ColumnType;
use crate::data::transform::TransformStep;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Failure to turn a file into a dataset. The store is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension '.{0}'")]
    UnsupportedFormat(String),

    #[error("malformed {format} input: {reason}")]
    Malformed {
        format: &'static str,
        reason: String,
    },

    #[error("input contains no columns")]
    Empty,
}

/// A single transform step failed. The pipeline aborts at the offending
/// step; no partially-mutated table is ever produced.
#[derive(Debug, Error)]
#[error("step {index} ({step}) on dataset v{version} failed: {reason}")]
pub struct TransformError {
    /// Position of the failing step in the ordered step list.
    pub index: usize,
    pub step: TransformStep,
    /// Version of the base dataset the pipeline ran against.
    pub version: u64,
    pub reason: String,
}

/// Artifact computation failed. Failures are surfaced to the caller and
/// never cached, so a retry recomputes.
#[derive(Debug, Error)]
pub enum ViewComputeError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}' is {dtype}, expected a numeric column")]
    NotNumeric {
        column: String,
        dtype: ColumnType,
    },

    #[error("empty selection for '{0}': no rows to compute on")]
    EmptySelection(String),

    #[error("distribution plot needs at least one bucket")]
    ZeroBuckets,
}

/// Everything the interaction controller can report to the user. No
/// variant is fatal to the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    View(#[from] ViewComputeError),

    #[error("no dataset loaded")]
    NoDataset,

    #[error("no transform step at index {0}")]
    NoSuchStep(usize),
}
