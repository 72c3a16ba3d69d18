//! Result model: classification, configuration, and the frozen report
//! record. Field order in `DivergenceResult` is the serialized order.

use crate::fingerprint::StepSummary;
use fl_algo::diff::DiffOp;
use serde::{Deserialize, Serialize};

/// Classification of the first disagreement (or of agreement).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceStatus {
    ExactMatch,
    OpDivergence,
    InputDivergence,
    OutputDivergence,
    ErrorDivergence,
    MissingSteps,
    ExtraSteps,
}

impl DivergenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenceStatus::ExactMatch => "exact_match",
            DivergenceStatus::OpDivergence => "op_divergence",
            DivergenceStatus::InputDivergence => "input_divergence",
            DivergenceStatus::OutputDivergence => "output_divergence",
            DivergenceStatus::ErrorDivergence => "error_divergence",
            DivergenceStatus::MissingSteps => "missing_steps",
            DivergenceStatus::ExtraSteps => "extra_steps",
        }
    }
}

/// Which explanatory diffs the result should carry. Affects the returned
/// record only; classification is unchanged.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Show {
    Input,
    Output,
    Both,
}

impl core::str::FromStr for Show {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Show::Input),
            "output" => Ok(Show::Output),
            "both" => Ok(Show::Both),
            other => Err(format!("expected input|output|both, got '{other}'")),
        }
    }
}

/// Engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct CompareConfig {
    /// Resync search window (steps ahead on each side).
    pub window: usize,
    /// Context radius: up to `2*context+1` step summaries per run.
    pub context: usize,
    pub show: Show,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            window: 10,
            context: 2,
            show: Show::Both,
        }
    }
}

/// The answer. Logically immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DivergenceResult {
    pub status: DivergenceStatus,
    pub idx_a: usize,
    pub idx_b: usize,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_step: Option<StepSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_step: Option<StepSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_diff: Option<Vec<DiffOp>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_diff: Option<Vec<DiffOp>>,
    /// Index of the last step compared equal; `None` when divergence is at
    /// index 0 (or the runs are empty).
    pub last_equal_idx: Option<usize>,
    pub context_a: Vec<StepSummary>,
    pub context_b: Vec<StepSummary>,
}
