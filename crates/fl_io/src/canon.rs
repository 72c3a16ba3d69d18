//! Canonical bytes, profile `strict` (the only profile in v0).
//!
//! - Mappings: entries sorted by NFC-normalized key (code-point order);
//!   compact object syntax, `,` / `:` separators
//! - Strings: NFC, then `\r\n` / lone `\r` collapsed to `\n`; JSON escaping;
//!   non-ASCII preserved verbatim
//! - Integers: minimal signed decimal
//! - Floats: `-0.0` → `0.0`; NaN/±Inf as the strings `"NaN"`, `"Infinity"`,
//!   `"-Infinity"`; finite values shortest-round-trip with a `.0` marker
//! - Booleans/null: `true` / `false` / `null` (booleans never collapse to ints)
//! - Sequences: compact array, order preserved
//! - Bytes: `{"$bytes":"<lowercase hex>"}`
//!
//! Semantically equal values yield byte-equal output; repeated invocation is
//! byte-identical. Recursion is bounded (cycle defense on tree-only inputs).

use crate::CanonError;
use fl_core::Value;
use unicode_normalization::UnicodeNormalization;

/// Default recursion bound for canonicalization.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Canonicalization knobs. One profile today; the depth bound is the only
/// tunable.
#[derive(Clone, Copy, Debug)]
pub struct CanonOptions {
    pub max_depth: usize,
}

impl Default for CanonOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Convert a value to canonical bytes (compact, no trailing newline).
pub fn to_canonical_bytes(v: &Value, opts: &CanonOptions) -> Result<Vec<u8>, CanonError> {
    let mut out = Vec::with_capacity(1024);
    write_value(v, opts.max_depth, &mut out)?;
    Ok(out)
}

fn write_value(v: &Value, depth_left: usize, out: &mut Vec<u8>) -> Result<(), CanonError> {
    if depth_left == 0 {
        return Err(CanonError::BadValueKind(
            "recursion depth exceeded (cyclic or pathologically deep value)".to_string(),
        ));
    }
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => {
            out.extend_from_slice(if *b { b"true" } else { b"false" });
        }
        Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Value::Float(f) => write_float(*f, out),
        Value::Str(s) => write_json_string(&normalize_text(s), out),
        Value::Bytes(raw) => {
            out.extend_from_slice(br#"{"$bytes":""#);
            out.extend_from_slice(hex::encode(raw).as_bytes());
            out.extend_from_slice(br#""}"#);
        }
        Value::Seq(items) => {
            out.push(b'[');
            let mut first = true;
            for item in items {
                if !first {
                    out.push(b',');
                }
                first = false;
                write_value(item, depth_left - 1, out)?;
            }
            out.push(b']');
        }
        Value::Map(entries) => {
            // Sort by NFC-normalized key; distinct keys that normalize to the
            // same form are both emitted, tie-broken by the original key.
            let mut sorted: Vec<(String, &String, &Value)> = entries
                .iter()
                .map(|(k, v)| (normalize_text(k), k, v))
                .collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

            out.push(b'{');
            let mut first = true;
            for (norm_key, _, value) in sorted {
                if !first {
                    out.push(b',');
                }
                first = false;
                write_json_string(&norm_key, out);
                out.push(b':');
                write_value(value, depth_left - 1, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// NFC first, then newline collapse — in that order, so the collapse cannot
/// split a combining sequence.
fn normalize_text(s: &str) -> String {
    let nfc: String = s.nfc().collect();
    if !nfc.contains('\r') {
        return nfc;
    }
    let mut out = String::with_capacity(nfc.len());
    let mut chars = nfc.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Emit a correctly escaped JSON string literal. serde_json escapes control
/// characters, quotes, and backslashes; non-ASCII passes through verbatim.
fn write_json_string(s: &str, out: &mut Vec<u8>) {
    let quoted = serde_json::to_string(s).expect("string serialization cannot fail");
    out.extend_from_slice(quoted.as_bytes());
}

fn write_float(f: f64, out: &mut Vec<u8>) {
    if f.is_nan() {
        out.extend_from_slice(br#""NaN""#);
        return;
    }
    if f.is_infinite() {
        out.extend_from_slice(if f > 0.0 {
            br#""Infinity""#.as_slice()
        } else {
            br#""-Infinity""#.as_slice()
        });
        return;
    }
    // -0.0 collapses to 0.0 before formatting.
    let f = if f == 0.0 { 0.0 } else { f };
    // Shortest round-trip formatting; a `.0` marker keeps the float token
    // distinct from a minimal integer literal.
    let mut s = format!("{f}");
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::Value;

    fn canon(v: &Value) -> String {
        String::from_utf8(to_canonical_bytes(v, &CanonOptions::default()).unwrap()).unwrap()
    }

    #[test]
    fn objects_are_sorted_arrays_preserved() {
        let v = Value::map([
            ("b", Value::Int(1)),
            (
                "a",
                Value::map([("y", Value::Int(1)), ("x", Value::Int(2))]),
            ),
            (
                "arr",
                Value::seq([
                    Value::map([("k", Value::Int(2)), ("j", Value::Int(1))]),
                    Value::Int(3),
                    Value::from("z"),
                ]),
            ),
        ]);
        assert_eq!(
            canon(&v),
            r#"{"a":{"x":2,"y":1},"arr":[{"j":1,"k":2},3,"z"],"b":1}"#
        );
    }

    #[test]
    fn nfc_equivalence() {
        let precomposed = Value::from("caf\u{e9}");
        let decomposed = Value::from("cafe\u{301}");
        assert_eq!(canon(&precomposed), canon(&decomposed));
    }

    #[test]
    fn newline_sequences_collapse() {
        let crlf = Value::from("a\r\nb");
        let lf = Value::from("a\nb");
        let cr = Value::from("a\rb");
        assert_eq!(canon(&crlf), canon(&lf));
        assert_eq!(canon(&cr), canon(&lf));
    }

    #[test]
    fn map_keys_are_nfc_normalized_before_sorting() {
        let m1 = Value::map([("caf\u{e9}", Value::Int(1))]);
        let m2 = Value::map([("cafe\u{301}", Value::Int(1))]);
        assert_eq!(canon(&m1), canon(&m2));
    }

    #[test]
    fn negative_zero_collapses() {
        assert_eq!(canon(&Value::Float(-0.0)), canon(&Value::Float(0.0)));
        assert_eq!(canon(&Value::Float(0.0)), "0.0");
    }

    #[test]
    fn booleans_are_not_integers() {
        assert_ne!(canon(&Value::Bool(true)), canon(&Value::Int(1)));
        assert_eq!(canon(&Value::Bool(true)), "true");
    }

    #[test]
    fn floats_stay_distinct_from_integers() {
        assert_eq!(canon(&Value::Int(1)), "1");
        assert_eq!(canon(&Value::Float(1.0)), "1.0");
        assert_eq!(canon(&Value::Float(1.5)), "1.5");
    }

    #[test]
    fn nonfinite_floats_are_string_literals() {
        assert_eq!(canon(&Value::Float(f64::NAN)), r#""NaN""#);
        assert_eq!(canon(&Value::Float(f64::INFINITY)), r#""Infinity""#);
        assert_eq!(canon(&Value::Float(f64::NEG_INFINITY)), r#""-Infinity""#);
    }

    #[test]
    fn integers_are_minimal_signed_decimal() {
        assert_eq!(canon(&Value::Int(0)), "0");
        assert_eq!(canon(&Value::Int(-1)), "-1");
        assert_eq!(canon(&Value::Int(42)), "42");
    }

    #[test]
    fn bytes_serialize_as_hex_wrapper() {
        let v = Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(canon(&v), r#"{"$bytes":"deadbeef"}"#);
    }

    #[test]
    fn non_ascii_preserved_not_escaped() {
        assert_eq!(canon(&Value::from("héllo→")), "\"héllo→\"");
    }

    #[test]
    fn depth_bound_trips_bad_value_kind() {
        let mut v = Value::Null;
        for _ in 0..300 {
            v = Value::seq([v]);
        }
        let err = to_canonical_bytes(&v, &CanonOptions::default()).unwrap_err();
        assert!(matches!(err, CanonError::BadValueKind(_)));
        // A custom bound permits the same value.
        let ok = to_canonical_bytes(&v, &CanonOptions { max_depth: 512 });
        assert!(ok.is_ok());
    }

    #[test]
    fn no_trailing_newline() {
        let bytes = to_canonical_bytes(&Value::map([("a", Value::Int(1))]), &CanonOptions::default())
            .unwrap();
        assert!(!bytes.ends_with(b"\n"));
    }
}
