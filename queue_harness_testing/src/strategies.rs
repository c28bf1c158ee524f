//! `proptest` strategies for scripted payloads.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Scalar JSON values, including integers at both ends of the `i64`/`u64`
/// range and any finite `f64`.
pub fn json_scalars() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("JSON has no NaN or infinity", |float| float.is_finite())
            .prop_map(Value::from),
        ".{0,12}".prop_map(Value::from),
    ]
}

/// Arbitrary JSON documents: scalars nested in arrays and objects.
pub fn json_values() -> impl Strategy<Value = Value> {
    json_scalars().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map(".{0,8}", inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}
