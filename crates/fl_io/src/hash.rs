//! SHA-256 hashing over canonical bytes.
//!
//! Deterministic: same canonical structure ⇒ same lowercase 64-hex across
//! OS/arch. Equal canonical outputs hash equal; the converse holds with
//! cryptographic probability.

use crate::canon::{to_canonical_bytes, CanonOptions};
use crate::CanonError;
use digest::Digest;
use fl_core::{ContentHash, Value};
use sha2::Sha256;

/// SHA-256 of raw bytes as a `ContentHash` (lowercase 64-hex).
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest: [u8; 32] = hasher.finalize().into();
    ContentHash::from(digest)
}

/// Canonical hash of a value: canonicalize, then SHA-256.
pub fn content_hash(v: &Value, opts: &CanonOptions) -> Result<ContentHash, CanonError> {
    Ok(hash_bytes(&to_canonical_bytes(v, opts)?))
}

/// Human preview form for logs: `sha256:<hash>:<first-16-hex-of-body-prefix>`.
/// Comparison always uses the full hex, never this form.
pub fn preview(hash: &ContentHash, canonical: &[u8]) -> String {
    let prefix = &canonical[..canonical.len().min(8)];
    format!("sha256:{}:{}", hash, hex::encode(prefix))
}
