//! fl_io — canonical bytes and content hashing.
//!
//! Single source of identity for the whole engine: any property other
//! components rely on (mapping-order independence, Unicode equivalence,
//! numeric stability) must hold here and nowhere else.
//!
//! - `canon`: Value → canonical byte sequence (profile `strict`)
//! - `hash`:  canonical bytes → lowercase 64-hex SHA-256 (`ContentHash`)
//!
//! Both are pure: no file, network, clock, or RNG access.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for fl_io (canonicalization & hashing).
#[derive(Debug, Error)]
pub enum CanonError {
    /// A value outside the grammar reached the canonicalizer — in practice,
    /// recursion past the depth bound (cycle defense). Programmer error.
    #[error("bad value kind: {0}")]
    BadValueKind(String),
}

pub type CanonResult<T> = Result<T, CanonError>;

pub mod canon;
pub mod hash;

pub mod prelude {
    pub use crate::canon::{to_canonical_bytes, CanonOptions};
    pub use crate::hash::{content_hash, hash_bytes, preview};
    pub use crate::{CanonError, CanonResult};
}
