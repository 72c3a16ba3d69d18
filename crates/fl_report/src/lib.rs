//! fl_report — render a divergence result for humans and machines.
//!
//! Rendering is deterministic: formatting decisions live here and nowhere
//! else, and the same result renders to the same bytes every time. The JSON
//! form is the direct serialization of `DivergenceResult`; the text form is
//! a fixed section order (status → explanation → step summaries → diffs →
//! last-equal index → context windows).

#![forbid(unsafe_code)]

pub mod render_json;
pub mod render_text;

pub use render_json::render_json;
pub use render_text::render_text;
