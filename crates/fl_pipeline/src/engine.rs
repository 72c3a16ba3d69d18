//! The lockstep walk, classification, and bounded resync.
//!
//! Classification priority at each index is strict:
//! 1. operation-name mismatch (after a failed or ambiguous resync)
//! 2. input mismatch
//! 3. error-state mismatch
//! 4. output mismatch
//! 5. residual event-list mismatch (reported as output divergence)
//!
//! Resync is an alignment probe, not an edit-distance alignment: it scans a
//! bounded window for the nearest pair of steps sharing a soft signature,
//! which catches the common single-insertion/single-deletion case while
//! keeping cost O(W·n) and classification local.

use fl_algo::diff::{diff, DiffOp};
use fl_core::{Run, Step, EVENT_INPUT, EVENT_OUTPUT};
use fl_io::canon::CanonOptions;

use crate::fingerprint::{fingerprint, summarize, StepFingerprint, StepSummary};
use crate::result::{CompareConfig, DivergenceResult, DivergenceStatus, Show};
use crate::PipelineError;

/// Compare two runs and return the first divergence (or exact match).
///
/// Total and deterministic; canonicalization failures from pathological
/// payloads propagate verbatim. Partial runs compare as-is: missing trailing
/// steps surface as a length mismatch.
pub fn find_first_divergence(
    a: &Run,
    b: &Run,
    cfg: &CompareConfig,
) -> Result<DivergenceResult, PipelineError> {
    let opts = CanonOptions::default();
    let fps_a = derive(a, &opts)?;
    let fps_b = derive(b, &opts)?;
    let walk = Walk {
        a,
        b,
        fps_a,
        fps_b,
        cfg,
    };
    Ok(walk.run())
}

fn derive(run: &Run, opts: &CanonOptions) -> Result<Vec<StepFingerprint>, PipelineError> {
    run.steps
        .iter()
        .map(|s| fingerprint(s, opts).map_err(PipelineError::from))
        .collect()
}

struct Walk<'a> {
    a: &'a Run,
    b: &'a Run,
    fps_a: Vec<StepFingerprint>,
    fps_b: Vec<StepFingerprint>,
    cfg: &'a CompareConfig,
}

impl Walk<'_> {
    fn run(&self) -> DivergenceResult {
        let n = self.a.steps.len().min(self.b.steps.len());
        for i in 0..n {
            let fa = &self.fps_a[i];
            let fb = &self.fps_b[i];

            if fa.name != fb.name {
                if let Some((da, db)) = self.resync(i) {
                    if db == 0 {
                        return self.span(DivergenceStatus::MissingSteps, i, i + da - 1);
                    }
                    if da == 0 {
                        return self.span(DivergenceStatus::ExtraSteps, i, i + db - 1);
                    }
                    // Both sides shifted: ambiguous; classify at i instead.
                }
                return self.op_divergence(i);
            }
            if fa.input_hash != fb.input_hash {
                return self.input_divergence(i);
            }
            if fa.has_error != fb.has_error || (fa.has_error && fa.error_hash != fb.error_hash) {
                return self.error_divergence(i);
            }
            if fa.output_hash != fb.output_hash {
                return self.output_divergence(i, false);
            }
            if fa.events_hash != fb.events_hash {
                return self.output_divergence(i, true);
            }
        }

        if self.a.steps.len() == self.b.steps.len() {
            return self.exact_match(n);
        }
        if self.a.steps.len() > self.b.steps.len() {
            self.span(DivergenceStatus::MissingSteps, n, self.a.steps.len() - 1)
        } else {
            self.span(DivergenceStatus::ExtraSteps, n, self.b.steps.len() - 1)
        }
    }

    /// Nearest soft-signature match within the window, ordered by
    /// `(da + db)` ascending, then `da`, then `db`. `(0, 0)` is excluded.
    fn resync(&self, i: usize) -> Option<(usize, usize)> {
        let w = self.cfg.window;
        for total in 1..=2 * w {
            for da in total.saturating_sub(w)..=total.min(w) {
                let db = total - da;
                let (ia, ib) = (i + da, i + db);
                if ia >= self.fps_a.len() || ib >= self.fps_b.len() {
                    continue;
                }
                if self.fps_a[ia].soft_signature() == self.fps_b[ib].soft_signature() {
                    return Some((da, db));
                }
            }
        }
        None
    }

    /* ------------------------------ builders ------------------------------ */

    fn base(
        &self,
        status: DivergenceStatus,
        idx_a: usize,
        idx_b: usize,
        explanation: String,
        last_equal_idx: Option<usize>,
    ) -> DivergenceResult {
        DivergenceResult {
            status,
            idx_a,
            idx_b,
            explanation,
            old_step: self.summary(&self.a.steps, &self.fps_a, idx_a),
            new_step: self.summary(&self.b.steps, &self.fps_b, idx_b),
            input_diff: None,
            output_diff: None,
            last_equal_idx,
            context_a: context_window(&self.a.steps, &self.fps_a, idx_a, self.cfg.context),
            context_b: context_window(&self.b.steps, &self.fps_b, idx_b, self.cfg.context),
        }
    }

    fn summary(
        &self,
        steps: &[Step],
        fps: &[StepFingerprint],
        idx: usize,
    ) -> Option<StepSummary> {
        steps.get(idx).map(|s| summarize(s, &fps[idx]))
    }

    fn exact_match(&self, n: usize) -> DivergenceResult {
        self.base(
            DivergenceStatus::ExactMatch,
            n,
            n,
            format!("Runs are identical ({n} steps compared)"),
            n.checked_sub(1),
        )
    }

    fn op_divergence(&self, i: usize) -> DivergenceResult {
        self.base(
            DivergenceStatus::OpDivergence,
            i,
            i,
            format!(
                "Step {i}: operation mismatch ('{}' vs '{}')",
                self.a.steps[i].name, self.b.steps[i].name
            ),
            i.checked_sub(1),
        )
    }

    fn input_divergence(&self, i: usize) -> DivergenceResult {
        let mut result = self.base(
            DivergenceStatus::InputDivergence,
            i,
            i,
            format!("Step {i} '{}': input differs", self.a.steps[i].name),
            i.checked_sub(1),
        );
        if !matches!(self.cfg.show, Show::Output) {
            result.input_diff = Some(self.diff_label(i, EVENT_INPUT));
        }
        result
    }

    fn error_divergence(&self, i: usize) -> DivergenceResult {
        self.base(
            DivergenceStatus::ErrorDivergence,
            i,
            i,
            format!("Step {i} '{}': error state differs", self.a.steps[i].name),
            i.checked_sub(1),
        )
    }

    fn output_divergence(&self, i: usize, residual_events: bool) -> DivergenceResult {
        let mut result = self.base(
            DivergenceStatus::OutputDivergence,
            i,
            i,
            format!(
                "Step {i} '{}': output differs (same input)",
                self.a.steps[i].name
            ),
            i.checked_sub(1),
        );
        if !matches!(self.cfg.show, Show::Input) {
            result.output_diff = Some(if residual_events {
                // Outputs agree but the event lists do not (e.g. tool_call
                // payloads): explain over the full ordered event sequences.
                diff(&self.a.steps[i].events_value(), &self.b.steps[i].events_value())
            } else {
                self.diff_label(i, EVENT_OUTPUT)
            });
        }
        result
    }

    fn diff_label(&self, i: usize, label: &str) -> Vec<DiffOp> {
        diff(
            &self.a.steps[i].aggregate(label),
            &self.b.steps[i].aggregate(label),
        )
    }

    fn span(&self, status: DivergenceStatus, i: usize, j: usize) -> DivergenceResult {
        let (from, other) = match status {
            DivergenceStatus::MissingSteps => ("run_a", "run_b"),
            _ => ("run_b", "run_a"),
        };
        let explanation = if i == j {
            format!("Step {i} from {from} missing in {other}")
        } else {
            format!("Step(s) {i}..{j} from {from} missing in {other}")
        };
        self.base(status, i, i, explanation, i.checked_sub(1))
    }
}

/// Up to `2c+1` summaries centered on `center`, clamped at the run ends.
fn context_window(
    steps: &[Step],
    fps: &[StepFingerprint],
    center: usize,
    c: usize,
) -> Vec<StepSummary> {
    if steps.is_empty() {
        return Vec::new();
    }
    let lo = center.saturating_sub(c);
    let hi = (center + c).min(steps.len() - 1);
    (lo..=hi)
        .filter(|&i| i < steps.len())
        .map(|i| summarize(&steps[i], &fps[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::{Event, RunStatus, Value, RUN_SCHEMA_VERSION};

    fn ev(kind: &str, payload: Value) -> Event {
        Event {
            event_type: kind.to_string(),
            payload,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn step(idx: usize, name: &str, events: Vec<Event>) -> Step {
        Step {
            idx,
            name: name.to_string(),
            events,
        }
    }

    fn run(id: &str, steps: Vec<Step>) -> Run {
        Run {
            run_id: id.to_string(),
            schema_version: RUN_SCHEMA_VERSION.to_string(),
            entrypoint: "demo".to_string(),
            steps,
            env_fingerprint: Value::Null,
            status: RunStatus::Success,
        }
    }

    fn plain(idx: usize, name: &str, seed: i64) -> Step {
        step(
            idx,
            name,
            vec![ev("input", Value::Int(seed)), ev("output", Value::Int(seed + 1))],
        )
    }

    #[test]
    fn resync_prefers_smallest_total_shift_then_da() {
        // A: [x, p, p]   B: [y, p, p]  — (1,1) is nearest, ambiguous.
        let a = run("a", vec![plain(0, "x", 0), plain(1, "p", 9), plain(2, "p", 9)]);
        let b = run("b", vec![plain(0, "y", 0), plain(1, "p", 9), plain(2, "p", 9)]);
        let cfg = CompareConfig::default();
        let result = find_first_divergence(&a, &b, &cfg).unwrap();
        // Ambiguous resync falls through to priority classification at 0.
        assert_eq!(result.status, DivergenceStatus::OpDivergence);
        assert_eq!(result.idx_a, 0);
        assert!(result.explanation.contains("'x'"));
        assert!(result.explanation.contains("'y'"));
        assert_eq!(result.last_equal_idx, None);
    }

    #[test]
    fn window_zero_disables_resync() {
        let a = run("a", vec![plain(0, "i", 0), plain(1, "gen", 1)]);
        let b = run(
            "b",
            vec![plain(0, "i", 0), plain(1, "extra", 7), plain(2, "gen", 1)],
        );
        let cfg = CompareConfig {
            window: 0,
            ..CompareConfig::default()
        };
        let result = find_first_divergence(&a, &b, &cfg).unwrap();
        assert_eq!(result.status, DivergenceStatus::OpDivergence);
        assert_eq!(result.idx_a, 1);
    }

    #[test]
    fn context_windows_clamp_at_run_ends() {
        let steps: Vec<Step> = (0..5).map(|i| plain(i, "s", i as i64)).collect();
        let a = run("a", steps.clone());
        let mut divergent = steps;
        divergent[4] = step(4, "s", vec![ev("input", Value::Int(99))]);
        let b = run("b", divergent);
        let cfg = CompareConfig {
            context: 2,
            ..CompareConfig::default()
        };
        let result = find_first_divergence(&a, &b, &cfg).unwrap();
        assert_eq!(result.status, DivergenceStatus::InputDivergence);
        assert_eq!(result.idx_a, 4);
        // [2, 3, 4] — clamped at the upper end.
        let idxs: Vec<usize> = result.context_a.iter().map(|s| s.idx).collect();
        assert_eq!(idxs, vec![2, 3, 4]);
    }

    #[test]
    fn empty_runs_match_exactly() {
        let a = run("a", vec![]);
        let b = run("b", vec![]);
        let result = find_first_divergence(&a, &b, &CompareConfig::default()).unwrap();
        assert_eq!(result.status, DivergenceStatus::ExactMatch);
        assert_eq!(result.explanation, "Runs are identical (0 steps compared)");
        assert_eq!(result.last_equal_idx, None);
        assert!(result.context_a.is_empty());
    }

    #[test]
    fn error_state_mismatch_beats_output_mismatch() {
        let healthy = step(
            0,
            "call",
            vec![ev("input", Value::Int(1)), ev("output", Value::Int(2))],
        );
        let failed = step(
            0,
            "call",
            vec![
                ev("input", Value::Int(1)),
                ev("error", Value::from("timeout")),
                ev("output", Value::Int(3)),
            ],
        );
        let a = run("a", vec![healthy]);
        let b = run("b", vec![failed]);
        let result = find_first_divergence(&a, &b, &CompareConfig::default()).unwrap();
        assert_eq!(result.status, DivergenceStatus::ErrorDivergence);
        assert_eq!(result.explanation, "Step 0 'call': error state differs");
    }

    #[test]
    fn differing_error_content_is_an_error_divergence() {
        let mk = |msg: &str| {
            step(
                0,
                "call",
                vec![ev("input", Value::Int(1)), ev("error", Value::from(msg))],
            )
        };
        let a = run("a", vec![mk("timeout")]);
        let b = run("b", vec![mk("rate limited")]);
        let result = find_first_divergence(&a, &b, &CompareConfig::default()).unwrap();
        assert_eq!(result.status, DivergenceStatus::ErrorDivergence);
    }

    #[test]
    fn matching_errors_do_not_diverge() {
        let mk = || {
            step(
                0,
                "call",
                vec![ev("input", Value::Int(1)), ev("error", Value::from("timeout"))],
            )
        };
        let a = run("a", vec![mk()]);
        let b = run("b", vec![mk()]);
        let result = find_first_divergence(&a, &b, &CompareConfig::default()).unwrap();
        assert_eq!(result.status, DivergenceStatus::ExactMatch);
    }

    #[test]
    fn residual_event_mismatch_reports_as_output_divergence() {
        let mk = |tool: &str| {
            step(
                0,
                "call",
                vec![
                    ev("input", Value::Int(1)),
                    ev("tool_call", Value::from(tool)),
                    ev("output", Value::Int(2)),
                ],
            )
        };
        let a = run("a", vec![mk("search")]);
        let b = run("b", vec![mk("fetch")]);
        let result = find_first_divergence(&a, &b, &CompareConfig::default()).unwrap();
        assert_eq!(result.status, DivergenceStatus::OutputDivergence);
        let ops = result.output_diff.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path, "$[1].payload");
    }
}
