//! fl_pipeline — where did two runs first diverge, and why?
//!
//! Lockstep walk over two recorded runs with strict classification priority
//! (operation name → input → error state → output → residual events), a
//! bounded resync probe to tell insertion/deletion apart from reordering,
//! and rule-based explanations. The result is total, deterministic, and
//! serializable; for a fixed `(A, B, config)` it is byte-identical across
//! invocations and machines.
//!
//! The engine compares derived hashes, never payloads — except where the
//! structural differ is invoked to explain an already-classified divergence.
//! First divergence halts the walk: cascading differences are downstream of
//! root cause and would mislead.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Engine failure. Callee errors are surfaced verbatim, never transformed
/// or retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Canon(#[from] fl_io::CanonError),
}

pub mod engine;
pub mod fingerprint;
pub mod result;

pub use engine::find_first_divergence;
pub use fingerprint::{fingerprint, summarize, StepFingerprint, StepSummary};
pub use result::{CompareConfig, DivergenceResult, DivergenceStatus, Show};
