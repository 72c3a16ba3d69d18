//! Property tests for the canonicalizer: determinism, order-independence,
//! equivalence classes (NFC, newlines, signed zero).

use fl_core::Value;
use fl_io::canon::{to_canonical_bytes, CanonOptions};
use fl_io::hash::content_hash;
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        "\\PC*".prop_map(Value::from),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Seq),
            proptest::collection::btree_map("\\PC{0,8}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn canonical_bytes_are_deterministic(v in value_strategy()) {
        let opts = CanonOptions::default();
        let first = to_canonical_bytes(&v, &opts).unwrap();
        for _ in 0..100 {
            prop_assert_eq!(&to_canonical_bytes(&v, &opts).unwrap(), &first);
        }
    }

    #[test]
    fn hash_tracks_bytes(v in value_strategy()) {
        let opts = CanonOptions::default();
        let h1 = content_hash(&v, &opts).unwrap();
        let h2 = content_hash(&v.clone(), &opts).unwrap();
        prop_assert_eq!(h1, h2);
    }

    #[test]
    fn crlf_and_cr_collapse_to_lf(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        let opts = CanonOptions::default();
        let crlf = Value::Str(format!("{prefix}\r\n{suffix}"));
        let cr = Value::Str(format!("{prefix}\r{suffix}"));
        let lf = Value::Str(format!("{prefix}\n{suffix}"));
        let want = to_canonical_bytes(&lf, &opts).unwrap();
        prop_assert_eq!(to_canonical_bytes(&crlf, &opts).unwrap(), want.clone());
        prop_assert_eq!(to_canonical_bytes(&cr, &opts).unwrap(), want);
    }

    #[test]
    fn map_insertion_order_is_irrelevant(
        pairs in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
    ) {
        let opts = CanonOptions::default();
        let forward = Value::map(pairs.iter().map(|(k, v)| (k.clone(), Value::Int(*v))));
        let reversed = Value::map(pairs.iter().rev().map(|(k, v)| (k.clone(), Value::Int(*v))));
        prop_assert_eq!(
            to_canonical_bytes(&forward, &opts).unwrap(),
            to_canonical_bytes(&reversed, &opts).unwrap()
        );
    }
}
