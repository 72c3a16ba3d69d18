//! Run / Step / Event — one recorded execution.
//!
//! A `Run` is an ordered list of named steps; each step holds an ordered list
//! of labeled events. Runs are immutable once ended: nothing in the engine
//! mutates a `Run` it is given. Event timestamps are metadata only and are
//! excluded from every comparison.

use crate::value::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wire schema revision carried by every persisted run.
pub const RUN_SCHEMA_VERSION: &str = "run.v0";

/// Event label consumed as aggregated step input.
pub const EVENT_INPUT: &str = "input";
/// Event label consumed as aggregated step output.
pub const EVENT_OUTPUT: &str = "output";
/// Event label marking a step-level error.
pub const EVENT_ERROR: &str = "error";

/// One labeled payload within a step.
///
/// `event_type` is an uninterpreted label; only `input`, `output`, and
/// `error` are special to the comparison engine. Everything else
/// (`tool_call`, `artifact_ref`, …) is carried through untouched.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub event_type: String,
    pub payload: Value,
    pub timestamp: String,
}

/// One logical operation in a run (a tool call, an LLM call, …).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    /// Position in the run; equals this step's index in `Run::steps`.
    pub idx: usize,
    pub name: String,
    /// Insertion order is total and stable.
    pub events: Vec<Event>,
}

impl Step {
    /// Aggregate the payloads of all events with the given label, in
    /// insertion order, as a sequence. This is the fixed aggregation shape
    /// for input/output hashing and diffing.
    pub fn aggregate(&self, label: &str) -> Value {
        Value::Seq(
            self.events
                .iter()
                .filter(|e| e.event_type == label)
                .map(|e| e.payload.clone())
                .collect(),
        )
    }

    /// True iff any event carries the `error` label.
    pub fn has_error(&self) -> bool {
        self.events.iter().any(|e| e.event_type == EVENT_ERROR)
    }

    /// The full ordered event list as a value: `[{"type", "payload"}, …]`.
    /// Timestamps are deliberately absent.
    pub fn events_value(&self) -> Value {
        Value::Seq(
            self.events
                .iter()
                .map(|e| {
                    Value::map([
                        ("type", Value::Str(e.event_type.clone())),
                        ("payload", e.payload.clone()),
                    ])
                })
                .collect(),
        )
    }
}

/// Terminal (or pending) state of a recorded run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunStatus {
    Success,
    Failure,
    Error,
    /// Run was started but never closed; trailing steps may be missing.
    Pending,
}

impl core::str::FromStr for RunStatus {
    type Err = crate::errors::CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "failure" => Ok(RunStatus::Failure),
            "error" => Ok(RunStatus::Error),
            "pending" => Ok(RunStatus::Pending),
            _ => Err(crate::errors::CoreError::InvalidStatus),
        }
    }
}

impl core::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Error => "error",
            RunStatus::Pending => "pending",
        })
    }
}

/// A recorded execution: ordered steps, each with ordered events.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Run {
    pub run_id: String,
    pub schema_version: String,
    /// Caller-supplied name of the workflow entrypoint (metadata; never compared).
    pub entrypoint: String,
    pub steps: Vec<Step>,
    /// Opaque environment snapshot captured by the caller (metadata; never compared).
    pub env_fingerprint: Value,
    pub status: RunStatus,
}
