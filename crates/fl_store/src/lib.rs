//! fl_store — the durable side of Forkline.
//!
//! A run log is a local append-only JSONL file: one tagged record per line
//! (`run_start` → `step_start`/`event`* → `run_end`), any number of runs
//! interleaved. Strictly offline; this crate owns all I/O and the only clock
//! in the workspace.
//!
//! - `recorder`: the sole writer. Every payload flows through the redaction
//!   boundary before a line is appended; there is no other write path.
//! - `reader`: replay a log into typed `Run` values, enforcing the run
//!   invariants (gap-free step indices, ordered events, closed-or-pending).

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for fl_store (recording, loading, validation).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not resolve a run id.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// A loaded log violates the run invariants (index gap, record after
    /// close, torn line). The engine is never handed such a run.
    #[error("corrupt run log: {0}")]
    CorruptRun(String),

    /// Canonicalization failure inside the redaction boundary.
    #[error(transparent)]
    Canon(#[from] fl_io::CanonError),

    /// Filesystem errors (open, append, read).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors on the write path.
    #[error("serialize: {0}")]
    Serde(#[from] serde_json::Error),

    /// API misuse (event outside a step, unknown or ended run, refused mode).
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub mod reader;
pub mod recorder;
pub mod records;

pub use reader::{RunStore, RunSummary};
pub use recorder::{RecordOptions, Recorder};
