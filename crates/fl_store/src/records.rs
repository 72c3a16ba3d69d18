//! Wire records: one JSON object per log line, tagged by `record`.

use fl_core::{RunStatus, Value};
use serde::{Deserialize, Serialize};

/// One line of a run log.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LogRecord {
    RunStart {
        run_id: String,
        schema_version: String,
        entrypoint: String,
        env_fingerprint: Value,
        started_at: String,
    },
    StepStart {
        run_id: String,
        idx: usize,
        name: String,
        at: String,
    },
    Event {
        run_id: String,
        step_idx: usize,
        #[serde(rename = "type")]
        event_type: String,
        payload: Value,
        at: String,
    },
    RunEnd {
        run_id: String,
        status: RunStatus,
        ended_at: String,
    },
}

impl LogRecord {
    /// The run this record belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            LogRecord::RunStart { run_id, .. }
            | LogRecord::StepStart { run_id, .. }
            | LogRecord::Event { run_id, .. }
            | LogRecord::RunEnd { run_id, .. } => run_id,
        }
    }
}
