//! JSON renderer: the direct serialization of the result record.

use fl_pipeline::DivergenceResult;

/// Serialize the result as one compact JSON document (no trailing newline).
///
/// Field order is fixed by the result struct, so output is byte-stable for
/// a fixed result.
pub fn render_json(result: &DivergenceResult) -> String {
    serde_json::to_string(result).expect("result serialization cannot fail")
}
