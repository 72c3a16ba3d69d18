//! Digest tokens: lowercase 64-hex content hashes.

use crate::errors::CoreError;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_lower_hex_len(s: &str, n: usize) -> bool {
    s.len() == n && is_lower_hex(s)
}

/// SHA-256 digest of canonical bytes, lowercase 64-hex.
///
/// Equality of `ContentHash` stands in for equality of the hashed payloads
/// everywhere in the engine; payloads themselves are never compared directly.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix (for previews). `len` is clamped to 1..=64.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.clamp(1, 64)]
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_lower_hex_len(s, 64) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::InvalidHex)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_64_hex() {
        let h: ContentHash = "a".repeat(64).parse().unwrap();
        assert_eq!(h.as_str().len(), 64);
        assert_eq!(h.short(12).len(), 12);
    }

    #[test]
    fn rejects_uppercase_and_short() {
        assert!("A".repeat(64).parse::<ContentHash>().is_err());
        assert!("ab".parse::<ContentHash>().is_err());
    }

    #[test]
    fn from_digest_roundtrips() {
        let h = ContentHash::from([0u8; 32]);
        assert_eq!(h.as_str(), "0".repeat(64));
    }
}
