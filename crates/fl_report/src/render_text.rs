//! Text renderer: fixed section order, one line per diff op.

use fl_algo::diff::DiffOp;
use fl_core::Value;
use fl_pipeline::{DivergenceResult, StepSummary};

/// Render the result as a human-readable report.
///
/// Sections, in order: status, explanation, both step summaries, any
/// selected diffs (`<op> <path>: <old> -> <new>`), the last-equal index,
/// and the two context windows. Absent sections are omitted, not blanked.
pub fn render_text(result: &DivergenceResult) -> String {
    let mut out = String::new();

    push_line(&mut out, &format!("status: {}", result.status.as_str()));
    push_line(&mut out, &format!("explanation: {}", result.explanation));

    if let Some(s) = &result.old_step {
        push_line(&mut out, &format!("step a{}", summary_line(s)));
    }
    if let Some(s) = &result.new_step {
        push_line(&mut out, &format!("step b{}", summary_line(s)));
    }

    if let Some(ops) = &result.input_diff {
        push_line(&mut out, "input diff:");
        for op in ops {
            push_line(&mut out, &format!("  {}", op_line(op)));
        }
    }
    if let Some(ops) = &result.output_diff {
        push_line(&mut out, "output diff:");
        for op in ops {
            push_line(&mut out, &format!("  {}", op_line(op)));
        }
    }

    match result.last_equal_idx {
        Some(i) => push_line(&mut out, &format!("last equal step: {i}")),
        None => push_line(&mut out, "last equal step: none"),
    }

    push_line(&mut out, "context a:");
    for s in &result.context_a {
        push_line(&mut out, &format!("  {}", summary_line(s)));
    }
    push_line(&mut out, "context b:");
    for s in &result.context_b {
        push_line(&mut out, &format!("  {}", summary_line(s)));
    }

    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn summary_line(s: &StepSummary) -> String {
    format!(
        "[{}] {}  input={} output={} events={} error={}",
        s.idx,
        s.name,
        s.input_hash.short(12),
        s.output_hash.short(12),
        s.event_count,
        if s.has_error { "yes" } else { "no" }
    )
}

/// `<op> <path>: <old> -> <new>`; an absent side renders as `-`.
fn op_line(op: &DiffOp) -> String {
    format!(
        "{} {}: {} -> {}",
        op.op,
        op.path,
        render_value(op.old.as_ref()),
        render_value(op.new.as_ref())
    )
}

fn render_value(v: Option<&Value>) -> String {
    match v {
        None => "-".to_string(),
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
