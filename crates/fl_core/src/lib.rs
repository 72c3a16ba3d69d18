//! fl_core — Value grammar, data model, and content-hash tokens.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`fl_io`, `fl_algo`, `fl_store`, `fl_pipeline`, `fl_report`,
//! `fl_cli`):
//!
//! - `Value`: the recursive payload grammar (tree-only; no shared substructure)
//! - `Event` / `Step` / `Run` / `RunStatus`: one recorded execution
//! - `ContentHash`: lowercase 64-hex digest token
//!
//! Serialization impls are gated behind the `serde` feature. `Value` carries
//! hand-written impls so the wire shape (`{"$bytes": hex}`, non-finite floats
//! as strings) stays under our control rather than a derive's.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidHex,
        InvalidStatus,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidHex => write!(f, "invalid hex digest"),
                CoreError::InvalidStatus => write!(f, "invalid run status"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod ids;
pub mod model;
pub mod value;

pub use errors::CoreError;
pub use ids::ContentHash;
pub use model::{
    Event, Run, RunStatus, Step, EVENT_ERROR, EVENT_INPUT, EVENT_OUTPUT, RUN_SCHEMA_VERSION,
};
pub use value::Value;
