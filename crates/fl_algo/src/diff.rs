//! Structural diff: an ordered list of edit operations turning `old` into
//! `new`.
//!
//! Determinism is the contract: repeated invocation on the same pair yields
//! byte-equal output. Ordering rules:
//! - mappings emit removes (old-only keys, sorted), then adds (new-only keys,
//!   sorted), then recurse into common keys (sorted)
//! - sequences compare pairwise by index, then emit trailing removes/adds in
//!   increasing index order
//!
//! The differ is total; there is no failure path.

use fl_core::Value;
use serde::{Deserialize, Serialize};

/// Edit operation kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
}

impl core::fmt::Display for OpKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
        })
    }
}

/// One edit at a path. `path` is rooted at `$`; `.<name>` descends into a
/// mapping entry (quoted as `['…']` when the name is not identifier-shaped),
/// `[i]` indexes a sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffOp {
    pub op: OpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new: Option<Value>,
}

impl DiffOp {
    fn add(path: String, new: &Value) -> Self {
        Self {
            op: OpKind::Add,
            path,
            old: None,
            new: Some(new.clone()),
        }
    }

    fn remove(path: String, old: &Value) -> Self {
        Self {
            op: OpKind::Remove,
            path,
            old: Some(old.clone()),
            new: None,
        }
    }

    fn replace(path: String, old: &Value, new: &Value) -> Self {
        Self {
            op: OpKind::Replace,
            path,
            old: Some(old.clone()),
            new: Some(new.clone()),
        }
    }
}

/// Compute the ordered edit list transforming `old` into `new`.
pub fn diff(old: &Value, new: &Value) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    diff_at(old, new, "$", &mut ops);
    ops
}

fn diff_at(old: &Value, new: &Value, path: &str, ops: &mut Vec<DiffOp>) {
    match (old, new) {
        (Value::Map(a), Value::Map(b)) => {
            // BTreeMap iteration is already key-sorted.
            for (k, v) in a {
                if !b.contains_key(k) {
                    ops.push(DiffOp::remove(key_path(path, k), v));
                }
            }
            for (k, v) in b {
                if !a.contains_key(k) {
                    ops.push(DiffOp::add(key_path(path, k), v));
                }
            }
            for (k, va) in a {
                if let Some(vb) = b.get(k) {
                    diff_at(va, vb, &key_path(path, k), ops);
                }
            }
        }
        (Value::Seq(a), Value::Seq(b)) => {
            let shared = a.len().min(b.len());
            for i in 0..shared {
                diff_at(&a[i], &b[i], &idx_path(path, i), ops);
            }
            for (i, v) in a.iter().enumerate().skip(shared) {
                ops.push(DiffOp::remove(idx_path(path, i), v));
            }
            for (i, v) in b.iter().enumerate().skip(shared) {
                ops.push(DiffOp::add(idx_path(path, i), v));
            }
        }
        _ => {
            if !atoms_equal(old, new) {
                ops.push(DiffOp::replace(path.to_string(), old, new));
            }
        }
    }
}

/// Atom equality. Integer and float compare by numeric value, not by tag;
/// floats treat bit-identical NaN as equal and `-0.0` as `0.0`. Any
/// remaining type mismatch (including sequence vs mapping reached via the
/// catch-all) is unequal and becomes a single replace.
fn atoms_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
            int_eq_float(*i, *f)
        }
        (Value::Float(x), Value::Float(y)) => x == y || x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn int_eq_float(i: i64, f: f64) -> bool {
    // Exact only: both conversions must round-trip.
    f.is_finite() && f.fract() == 0.0 && f == (i as f64) && (f as i64) == i
}

fn is_plain_key(k: &str) -> bool {
    let mut chars = k.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn key_path(base: &str, key: &str) -> String {
    if is_plain_key(key) {
        format!("{base}.{key}")
    } else {
        let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
        format!("{base}['{escaped}']")
    }
}

fn idx_path(base: &str, i: usize) -> String {
    format!("{base}[{i}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_produce_no_ops() {
        let v = Value::map([("a", Value::Int(1)), ("b", Value::seq([Value::Null]))]);
        assert!(diff(&v, &v.clone()).is_empty());
    }

    #[test]
    fn scalar_replace_at_nested_path() {
        let old = Value::seq([Value::map([("text", Value::from("Expected response"))])]);
        let new = Value::seq([Value::map([("text", Value::from("Different response"))])]);
        let ops = diff(&old, &new);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, OpKind::Replace);
        assert_eq!(ops[0].path, "$[0].text");
        assert_eq!(ops[0].old, Some(Value::from("Expected response")));
        assert_eq!(ops[0].new, Some(Value::from("Different response")));
    }

    #[test]
    fn mapping_removes_then_adds_then_recursion() {
        let old = Value::map([
            ("zap", Value::Int(1)),
            ("common", Value::Int(2)),
            ("aaa", Value::Int(3)),
        ]);
        let new = Value::map([
            ("common", Value::Int(99)),
            ("bbb", Value::Int(4)),
            ("yyy", Value::Int(5)),
        ]);
        let ops = diff(&old, &new);
        let shape: Vec<(OpKind, &str)> =
            ops.iter().map(|o| (o.op, o.path.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (OpKind::Remove, "$.aaa"),
                (OpKind::Remove, "$.zap"),
                (OpKind::Add, "$.bbb"),
                (OpKind::Add, "$.yyy"),
                (OpKind::Replace, "$.common"),
            ]
        );
    }

    #[test]
    fn sequence_trailing_ops_in_index_order() {
        let old = Value::seq([Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
        let new = Value::seq([Value::Int(1), Value::Int(9)]);
        let ops = diff(&old, &new);
        let shape: Vec<(OpKind, &str)> =
            ops.iter().map(|o| (o.op, o.path.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (OpKind::Replace, "$[1]"),
                (OpKind::Remove, "$[2]"),
                (OpKind::Remove, "$[3]"),
            ]
        );

        let ops = diff(&new, &old);
        let shape: Vec<(OpKind, &str)> =
            ops.iter().map(|o| (o.op, o.path.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (OpKind::Replace, "$[1]"),
                (OpKind::Add, "$[2]"),
                (OpKind::Add, "$[3]"),
            ]
        );
    }

    #[test]
    fn type_mismatch_is_a_single_replace() {
        let old = Value::map([("x", Value::Int(1))]);
        let new = Value::seq([Value::Int(1)]);
        let ops = diff(&old, &new);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, OpKind::Replace);
        assert_eq!(ops[0].path, "$");
    }

    #[test]
    fn numeric_cross_type_equality() {
        assert!(diff(&Value::Int(3), &Value::Float(3.0)).is_empty());
        assert_eq!(diff(&Value::Int(3), &Value::Float(3.5)).len(), 1);
        // Beyond 2^53 the conversion no longer round-trips.
        let big = (1i64 << 53) + 1;
        assert_eq!(diff(&Value::Int(big), &Value::Float(big as f64)).len(), 1);
    }

    #[test]
    fn int_vs_string_is_type_mismatch() {
        let ops = diff(&Value::Int(1), &Value::from("1"));
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op, OpKind::Replace);
    }

    #[test]
    fn awkward_keys_are_quoted() {
        let old = Value::map([("a.b", Value::Int(1)), ("plain", Value::Int(2))]);
        let new = Value::map([("plain", Value::Int(2))]);
        let ops = diff(&old, &new);
        assert_eq!(ops[0].path, "$['a.b']");
    }

    #[test]
    fn op_serialization_shape() {
        let ops = diff(&Value::Int(1), &Value::Int(2));
        let s = serde_json::to_string(&ops[0]).unwrap();
        assert_eq!(s, r#"{"op":"replace","path":"$","old":1,"new":2}"#);
    }
}
