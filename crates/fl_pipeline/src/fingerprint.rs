//! Derived step identity: fingerprints and summaries.
//!
//! Recomputed on demand, never persisted. All hashing goes through the
//! canonicalizer; two steps with equal fingerprints are equal for every
//! question the engine asks.

use fl_core::{ContentHash, Step, EVENT_ERROR, EVENT_INPUT, EVENT_OUTPUT};
use fl_io::canon::CanonOptions;
use fl_io::hash::content_hash;
use fl_io::CanonError;
use serde::{Deserialize, Serialize};

/// Full derived identity of one step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepFingerprint {
    pub name: String,
    /// Hash of the ordered sequence of `input` payloads.
    pub input_hash: ContentHash,
    /// Hash of the ordered sequence of `output` payloads.
    pub output_hash: ContentHash,
    pub has_error: bool,
    /// Hash of the full ordered event list (types + payloads, no timestamps).
    pub events_hash: ContentHash,
    /// Hash of the ordered sequence of `error` payloads (error-state compare).
    pub error_hash: ContentHash,
}

impl StepFingerprint {
    /// The resync key: `(name, input_hash)`.
    pub fn soft_signature(&self) -> (&str, &ContentHash) {
        (&self.name, &self.input_hash)
    }
}

/// Derive a step's fingerprint.
pub fn fingerprint(step: &Step, opts: &CanonOptions) -> Result<StepFingerprint, CanonError> {
    Ok(StepFingerprint {
        name: step.name.clone(),
        input_hash: content_hash(&step.aggregate(EVENT_INPUT), opts)?,
        output_hash: content_hash(&step.aggregate(EVENT_OUTPUT), opts)?,
        has_error: step.has_error(),
        events_hash: content_hash(&step.events_value(), opts)?,
        error_hash: content_hash(&step.aggregate(EVENT_ERROR), opts)?,
    })
}

/// Reporting view of one step.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub idx: usize,
    pub name: String,
    pub input_hash: ContentHash,
    pub output_hash: ContentHash,
    pub event_count: usize,
    pub has_error: bool,
}

/// Build the reporting view from a step and its fingerprint.
pub fn summarize(step: &Step, fp: &StepFingerprint) -> StepSummary {
    StepSummary {
        idx: step.idx,
        name: step.name.clone(),
        input_hash: fp.input_hash.clone(),
        output_hash: fp.output_hash.clone(),
        event_count: step.events.len(),
        has_error: fp.has_error,
    }
}
