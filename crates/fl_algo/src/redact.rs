//! Payload redaction: the only authorized transform in front of persistence.
//!
//! A policy is an ordered rule list; the first matching rule wins. Patterns
//! are case-insensitive substrings over the current mapping key and the
//! dot-joined key path from the root. Matching entries are replaced whole
//! (mask), hashed, or dropped — never recursed into. Keys on the policy's
//! structural-metadata allowlist are exempt from matching.
//!
//! The transform is pure and deterministic; the input value is never
//! mutated. Bad policies are rejected at construction, never at redaction
//! time.

use std::collections::{BTreeMap, BTreeSet};

use digest::Digest;
use fl_core::Value;
use fl_io::canon::{to_canonical_bytes, CanonOptions};
use fl_io::hash::content_hash;
use fl_io::CanonError;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

/// Replacement literal for masked values.
pub const REDACTED: &str = "[REDACTED]";

/// Key substrings treated as secrets by the default policy.
pub const SECRET_KEY_PATTERNS: &[&str] = &[
    "api_key",
    "apikey",
    "token",
    "secret",
    "password",
    "access_token",
    "refresh_token",
    "private_key",
    "credentials",
    "auth",
    "session",
    "csrf",
    "authorization",
    "cookie",
    "set-cookie",
];

/// Structural-metadata keys exempt from rule matching in the default policy.
pub const STRUCTURAL_KEYS: &[&str] = &[
    "run_id",
    "event_id",
    "step_id",
    "timestamp",
    "created_at",
    "started_at",
    "ended_at",
    "status",
    "duration",
    "type",
    "name",
    "tool",
    "model",
    "entrypoint",
];

/// What to do with a matched entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Replace the value with `"[REDACTED]"`.
    Mask,
    /// Replace the value with `"hash:" + canonical-hash(value)`.
    Hash,
    /// Omit the mapping entry entirely.
    Drop,
}

/// One redaction rule. A rule matches iff every pattern it specifies
/// matches; a rule must specify at least one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path_pattern: Option<String>,
}

impl Rule {
    pub fn key(action: Action, pattern: &str) -> Self {
        Self {
            action,
            key_pattern: Some(pattern.to_string()),
            path_pattern: None,
        }
    }

    pub fn path(action: Action, pattern: &str) -> Self {
        Self {
            action,
            key_pattern: None,
            path_pattern: Some(pattern.to_string()),
        }
    }
}

/// Malformed policy, rejected at construction.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("rule {0}: no pattern specified")]
    RuleWithoutPattern(usize),
    #[error("rule {0}: empty pattern")]
    EmptyPattern(usize),
}

#[derive(Clone, Debug)]
struct CompiledRule {
    action: Action,
    key_pattern: Option<String>,  // lowercased
    path_pattern: Option<String>, // lowercased
}

impl CompiledRule {
    fn matches(&self, key: Option<&str>, path: &str) -> bool {
        if let Some(pat) = &self.key_pattern {
            match key {
                Some(k) if k.contains(pat.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(pat) = &self.path_pattern {
            if !path.contains(pat.as_str()) {
                return false;
            }
        }
        true
    }
}

/// An ordered, validated redaction policy.
#[derive(Clone, Debug)]
pub struct Policy {
    rules: Vec<CompiledRule>,
    exempt_keys: BTreeSet<String>, // lowercased
}

impl Policy {
    /// Validate and compile an ordered rule list.
    pub fn new(rules: Vec<Rule>) -> Result<Self, PolicyError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (i, rule) in rules.into_iter().enumerate() {
            if rule.key_pattern.is_none() && rule.path_pattern.is_none() {
                return Err(PolicyError::RuleWithoutPattern(i));
            }
            if rule.key_pattern.as_deref() == Some("")
                || rule.path_pattern.as_deref() == Some("")
            {
                return Err(PolicyError::EmptyPattern(i));
            }
            compiled.push(CompiledRule {
                action: rule.action,
                key_pattern: rule.key_pattern.map(|p| p.to_lowercase()),
                path_pattern: rule.path_pattern.map(|p| p.to_lowercase()),
            });
        }
        Ok(Self {
            rules: compiled,
            exempt_keys: BTreeSet::new(),
        })
    }

    /// The identity policy: no rules, everything passes through.
    pub fn identity() -> Self {
        Self {
            rules: Vec::new(),
            exempt_keys: BTreeSet::new(),
        }
    }

    /// Exempt the given keys from rule matching (case-insensitive).
    pub fn with_exempt_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exempt_keys
            .extend(keys.into_iter().map(|k| k.as_ref().to_lowercase()));
        self
    }

    pub fn is_identity(&self) -> bool {
        self.rules.is_empty()
    }

    fn decide(&self, key: &str, path: &str) -> Option<Action> {
        if self.exempt_keys.contains(key) {
            return None;
        }
        self.rules
            .iter()
            .find(|r| r.matches(Some(key), path))
            .map(|r| r.action)
    }

    fn decide_path_only(&self, path: &str) -> Option<Action> {
        self.rules
            .iter()
            .filter(|r| r.key_pattern.is_none())
            .find(|r| r.matches(None, path))
            .map(|r| r.action)
    }
}

/// The default policy: mask secret-looking keys, keep structural metadata.
pub fn safe_policy() -> Policy {
    let rules = SECRET_KEY_PATTERNS
        .iter()
        .map(|p| Rule::key(Action::Mask, p))
        .collect();
    Policy::new(rules)
        .expect("built-in policy is well-formed")
        .with_exempt_keys(STRUCTURAL_KEYS.iter().copied())
}

/// Escalation mode selecting the policy applied at the storage boundary.
/// Mode selection is policy selection, not engine behavior.
#[derive(Clone)]
pub enum RedactionMode {
    /// Default: secrets masked, structural metadata preserved.
    Safe,
    /// Identity policy; raw payloads persisted. The recorder refuses this
    /// mode unless raw capture is explicitly enabled.
    Debug,
    /// Secret rules applied first (secrets are never retained raw), then the
    /// whole payload is sealed with authenticated encryption under an
    /// out-of-band key.
    EncryptedDebug { key: [u8; 32] },
}

impl RedactionMode {
    pub fn name(&self) -> &'static str {
        match self {
            RedactionMode::Safe => "safe",
            RedactionMode::Debug => "debug",
            RedactionMode::EncryptedDebug { .. } => "encrypted_debug",
        }
    }

    /// True iff the mode persists raw (unredacted, unsealed) payloads.
    pub fn is_raw(&self) -> bool {
        matches!(self, RedactionMode::Debug)
    }

    /// Apply the mode's full transform to one payload.
    pub fn apply(&self, v: &Value) -> Result<Value, CanonError> {
        match self {
            RedactionMode::Safe => redact(&safe_policy(), v),
            RedactionMode::Debug => Ok(v.clone()),
            RedactionMode::EncryptedDebug { key } => {
                let redacted = redact(&safe_policy(), v)?;
                seal(key, &redacted)
            }
        }
    }
}

impl core::fmt::Debug for RedactionMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never expose key material through Debug output.
        f.write_str(self.name())
    }
}

/// Transform a payload according to `policy`. The input is untouched; the
/// result is a fresh value suitable for persistence.
pub fn redact(policy: &Policy, v: &Value) -> Result<Value, CanonError> {
    let mut path = Vec::new();
    redact_value(policy, v, &mut path)
}

fn redact_value(
    policy: &Policy,
    v: &Value,
    path: &mut Vec<String>,
) -> Result<Value, CanonError> {
    match v {
        Value::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, value) in entries {
                let key_lc = key.to_lowercase();
                path.push(key_lc.clone());
                let decision = policy.decide(&key_lc, &path.join("."));
                let replacement = match decision {
                    Some(Action::Drop) => None,
                    Some(Action::Mask) => Some(Value::Str(REDACTED.to_string())),
                    Some(Action::Hash) => Some(Value::Str(format!(
                        "hash:{}",
                        content_hash(value, &CanonOptions::default())?
                    ))),
                    None => Some(redact_value(policy, value, path)?),
                };
                path.pop();
                if let Some(r) = replacement {
                    out.insert(key.clone(), r);
                }
            }
            Ok(Value::Map(out))
        }
        Value::Seq(items) => {
            // No key in scope: only path-only rules may fire, against the
            // path of the nearest enclosing mapping entry.
            let joined = path.join(".");
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match policy.decide_path_only(&joined) {
                    Some(Action::Drop) => {}
                    Some(Action::Mask) => out.push(Value::Str(REDACTED.to_string())),
                    Some(Action::Hash) => out.push(Value::Str(format!(
                        "hash:{}",
                        content_hash(item, &CanonOptions::default())?
                    ))),
                    None => out.push(redact_value(policy, item, path)?),
                }
            }
            Ok(Value::Seq(out))
        }
        leaf => Ok(leaf.clone()),
    }
}

/// Seal a value: canonical bytes encrypted with ChaCha20-Poly1305. The nonce
/// is derived from `SHA-256(key ‖ canonical bytes)`, keeping the transform
/// pure (same key and payload ⇒ byte-identical output).
pub fn seal(key: &[u8; 32], v: &Value) -> Result<Value, CanonError> {
    use chacha20poly1305::aead::{Aead, KeyInit};
    use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

    let bytes = to_canonical_bytes(v, &CanonOptions::default())?;

    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(&bytes);
    let derived: [u8; 32] = hasher.finalize().into();
    let nonce = Nonce::from_slice(&derived[..12]);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(nonce, bytes.as_slice())
        .expect("in-memory encryption cannot fail");

    Ok(Value::map([(
        "$sealed",
        Value::map([
            ("alg", Value::from("chacha20poly1305")),
            ("nonce", Value::from(hex::encode(&derived[..12]))),
            ("ct", Value::from(hex::encode(ciphertext))),
        ]),
    )]))
}

/// Reverse `seal`. Returns `None` when the value is not a sealed wrapper or
/// the key fails authentication.
pub fn unseal(key: &[u8; 32], v: &Value) -> Option<Value> {
    use chacha20poly1305::aead::{Aead, KeyInit};
    use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

    let Value::Map(outer) = v else { return None };
    let Some(Value::Map(inner)) = outer.get("$sealed") else {
        return None;
    };
    let Some(Value::Str(alg)) = inner.get("alg") else {
        return None;
    };
    if alg != "chacha20poly1305" {
        return None;
    }
    let (Some(Value::Str(nonce_hex)), Some(Value::Str(ct_hex))) =
        (inner.get("nonce"), inner.get("ct"))
    else {
        return None;
    };
    let nonce_raw = hex::decode(nonce_hex).ok()?;
    if nonce_raw.len() != 12 {
        return None;
    }
    let ciphertext = hex::decode(ct_hex).ok()?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let plain = cipher
        .decrypt(Nonce::from_slice(&nonce_raw), ciphertext.as_slice())
        .ok()?;
    serde_json::from_slice(&plain).ok()
}
