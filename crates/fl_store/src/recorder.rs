//! The recording interface — and the only writer.
//!
//! The recorder holds the redaction policy; every payload passes through it
//! before a line is appended. A persistence path that bypasses redaction is
//! structurally impossible: nothing else in the workspace writes run logs.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use digest::Digest;
use fl_algo::redact::{redact, safe_policy, seal, Policy, RedactionMode};
use fl_core::{RunStatus, Value, RUN_SCHEMA_VERSION};
use sha2::Sha256;

use crate::records::LogRecord;
use crate::{StoreError, StoreResult};

/// Recorder knobs. `Debug` mode persists raw payloads and is refused unless
/// `allow_raw` is set explicitly.
#[derive(Clone, Debug)]
pub struct RecordOptions {
    pub mode: RedactionMode,
    pub allow_raw: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            mode: RedactionMode::Safe,
            allow_raw: false,
        }
    }
}

#[derive(Debug)]
struct OpenRun {
    next_step: usize,
    has_open_step: bool,
}

/// Appends run records to a JSONL log.
#[derive(Debug)]
pub struct Recorder {
    path: PathBuf,
    mode: RedactionMode,
    policy: Policy,
    open: BTreeMap<String, OpenRun>,
    seq: u64,
}

impl Recorder {
    /// Open (or create) the log at `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P, options: RecordOptions) -> StoreResult<Self> {
        if options.mode.is_raw() && !options.allow_raw {
            return Err(StoreError::Invalid(
                "debug mode persists raw payloads; pass allow_raw to enable it".to_string(),
            ));
        }
        let policy = match options.mode {
            RedactionMode::Debug => Policy::identity(),
            _ => safe_policy(),
        };
        // Touch the file so an empty store is distinguishable from a missing one.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            mode: options.mode,
            policy,
            open: BTreeMap::new(),
            seq: 0,
        })
    }

    /// Begin a run; returns its id.
    pub fn start_run(&mut self, entrypoint: &str, env_fingerprint: Value) -> StoreResult<String> {
        let now = Utc::now();
        self.seq += 1;

        let mut hasher = Sha256::new();
        hasher.update(entrypoint.as_bytes());
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        hasher.update(self.seq.to_be_bytes());
        let digest: [u8; 32] = hasher.finalize().into();

        let run_id = format!(
            "run-{}-{}",
            now.format("%Y%m%dT%H%M%SZ"),
            &hex::encode(digest)[..12]
        );

        self.append(&LogRecord::RunStart {
            run_id: run_id.clone(),
            schema_version: RUN_SCHEMA_VERSION.to_string(),
            entrypoint: entrypoint.to_string(),
            env_fingerprint,
            started_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        })?;
        self.open.insert(
            run_id.clone(),
            OpenRun {
                next_step: 0,
                has_open_step: false,
            },
        );
        Ok(run_id)
    }

    /// Open the next step of a run; returns its index.
    pub fn start_step(&mut self, run_id: &str, name: &str) -> StoreResult<usize> {
        if name.is_empty() {
            return Err(StoreError::Invalid("step name must be non-empty".to_string()));
        }
        let state = self.open_run_mut(run_id)?;
        let idx = state.next_step;
        state.next_step += 1;
        state.has_open_step = true;
        self.append(&LogRecord::StepStart {
            run_id: run_id.to_string(),
            idx,
            name: name.to_string(),
            at: now_utc(),
        })?;
        Ok(idx)
    }

    /// Log one event into the run's open step. The payload flows through the
    /// redaction boundary before persistence.
    pub fn log_event(&mut self, run_id: &str, event_type: &str, payload: &Value) -> StoreResult<()> {
        let state = self.open_run_mut(run_id)?;
        if !state.has_open_step {
            return Err(StoreError::Invalid(
                "event outside an open step; call start_step first".to_string(),
            ));
        }
        let step_idx = state.next_step - 1;

        let persisted = match &self.mode {
            RedactionMode::Debug => payload.clone(),
            RedactionMode::Safe => redact(&self.policy, payload)?,
            RedactionMode::EncryptedDebug { key } => seal(key, &redact(&self.policy, payload)?)?,
        };

        self.append(&LogRecord::Event {
            run_id: run_id.to_string(),
            step_idx,
            event_type: event_type.to_string(),
            payload: persisted,
            at: now_utc(),
        })
    }

    /// Close a run with a terminal status. Further records for the id are
    /// refused.
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> StoreResult<()> {
        if self.open.remove(run_id).is_none() {
            return Err(StoreError::Invalid(format!(
                "unknown or already ended run: {run_id}"
            )));
        }
        self.append(&LogRecord::RunEnd {
            run_id: run_id.to_string(),
            status,
            ended_at: now_utc(),
        })
    }

    fn open_run_mut(&mut self, run_id: &str) -> StoreResult<&mut OpenRun> {
        self.open
            .get_mut(run_id)
            .ok_or_else(|| StoreError::Invalid(format!("unknown or already ended run: {run_id}")))
    }

    fn append(&self, record: &LogRecord) -> StoreResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let line = serde_json::to_string(record)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
