//! Replay a run log into typed `Run` values.
//!
//! Loading enforces the run invariants before the engine ever sees a run:
//! step indices gap-free, events attached to the open step only, nothing
//! after `run_end`, every line intact. Violations are `CorruptRun`; a log
//! that closed cleanly but carries no `run_end` for a run loads it as
//! `Pending`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use fl_core::{Event, Run, RunStatus, Step, Value};
use serde::Serialize;

use crate::records::LogRecord;
use crate::{StoreError, StoreResult};

/// Read-only view over a run log.
#[derive(Clone, Debug)]
pub struct RunStore {
    path: PathBuf,
}

/// One row of `list_runs` (file order).
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub entrypoint: String,
    pub started_at: String,
    pub status: RunStatus,
    pub step_count: usize,
}

impl RunStore {
    /// Open a store at `path`. The file must exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StoreError::RunNotFound(format!(
                "no run log at {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Load one run by id, validating invariants along the way.
    pub fn load_run(&self, run_id: &str) -> StoreResult<Run> {
        let mut run: Option<Run> = None;
        let mut ended = false;

        self.replay(|lineno, record| {
            if record.run_id() != run_id {
                return Ok(());
            }
            if ended {
                return Err(corrupt(lineno, "record after run_end"));
            }
            match record {
                LogRecord::RunStart {
                    run_id,
                    schema_version,
                    entrypoint,
                    env_fingerprint,
                    ..
                } => {
                    if run.is_some() {
                        return Err(corrupt(lineno, "duplicate run_start"));
                    }
                    run = Some(Run {
                        run_id,
                        schema_version,
                        entrypoint,
                        steps: Vec::new(),
                        env_fingerprint,
                        status: RunStatus::Pending,
                    });
                }
                LogRecord::StepStart { idx, name, .. } => {
                    let run = run
                        .as_mut()
                        .ok_or_else(|| corrupt(lineno, "step_start before run_start"))?;
                    if idx != run.steps.len() {
                        return Err(corrupt(
                            lineno,
                            &format!("step index gap: got {idx}, expected {}", run.steps.len()),
                        ));
                    }
                    if name.is_empty() {
                        return Err(corrupt(lineno, "missing step name"));
                    }
                    run.steps.push(Step {
                        idx,
                        name,
                        events: Vec::new(),
                    });
                }
                LogRecord::Event {
                    step_idx,
                    event_type,
                    payload,
                    at,
                    ..
                } => {
                    let run = run
                        .as_mut()
                        .ok_or_else(|| corrupt(lineno, "event before run_start"))?;
                    let open = run.steps.len().checked_sub(1);
                    if open != Some(step_idx) {
                        return Err(corrupt(
                            lineno,
                            &format!("event for step {step_idx} but open step is {open:?}"),
                        ));
                    }
                    run.steps[step_idx].events.push(Event {
                        event_type,
                        payload,
                        timestamp: at,
                    });
                }
                LogRecord::RunEnd { status, .. } => {
                    let run = run
                        .as_mut()
                        .ok_or_else(|| corrupt(lineno, "run_end before run_start"))?;
                    run.status = status;
                    ended = true;
                }
            }
            Ok(())
        })?;

        run.ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))
    }

    /// Summaries of every run in the log, in file order.
    pub fn list_runs(&self) -> StoreResult<Vec<RunSummary>> {
        let mut order: Vec<String> = Vec::new();
        let mut summaries: std::collections::BTreeMap<String, RunSummary> = Default::default();

        self.replay(|lineno, record| {
            match record {
                LogRecord::RunStart {
                    run_id,
                    entrypoint,
                    started_at,
                    ..
                } => {
                    if summaries.contains_key(&run_id) {
                        return Err(corrupt(lineno, "duplicate run_start"));
                    }
                    order.push(run_id.clone());
                    summaries.insert(
                        run_id.clone(),
                        RunSummary {
                            run_id,
                            entrypoint,
                            started_at,
                            status: RunStatus::Pending,
                            step_count: 0,
                        },
                    );
                }
                LogRecord::StepStart { run_id, .. } => {
                    if let Some(s) = summaries.get_mut(&run_id) {
                        s.step_count += 1;
                    }
                }
                LogRecord::RunEnd { run_id, status, .. } => {
                    if let Some(s) = summaries.get_mut(&run_id) {
                        s.status = status;
                    }
                }
                LogRecord::Event { .. } => {}
            }
            Ok(())
        })?;

        Ok(order
            .into_iter()
            .filter_map(|id| summaries.remove(&id))
            .collect())
    }

    /// Load the opaque environment fingerprint recorded for a run.
    pub fn env_fingerprint(&self, run_id: &str) -> StoreResult<Value> {
        Ok(self.load_run(run_id)?.env_fingerprint)
    }

    fn replay<F>(&self, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(usize, LogRecord) -> StoreResult<()>,
    {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: LogRecord = serde_json::from_str(&line)
                .map_err(|e| corrupt(i + 1, &format!("unreadable record: {e}")))?;
            visit(i + 1, record)?;
        }
        Ok(())
    }
}

fn corrupt(lineno: usize, msg: &str) -> StoreError {
    StoreError::CorruptRun(format!("line {lineno}: {msg}"))
}
