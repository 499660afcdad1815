//! Property-based test generators using proptest.
//!
//! Provides strategies for generating JSON values and documents.

use amazedb_core::Document;
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

/// Strategy for valid database and table names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_-]{1,24}").expect("Invalid regex")
}

/// Strategy for document field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex")
}

/// Strategy for finite JSON numbers, integral and fractional.
pub fn number_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        (-1.0e9f64..1.0e9f64).prop_map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number)),
    ]
}

/// Strategy for scalar JSON values (null, bool, number, string).
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        number_strategy(),
        prop::string::string_regex("[a-z0-9 ]{0,8}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for arbitrary JSON values, nested up to a few levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for documents with arbitrary fields.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..6)
        .prop_map(|fields| fields.into_iter().collect::<Map<String, Value>>())
}

/// Strategy for document lists where each document has an integer `k` in
/// `0..keys` (so duplicates are common) and `seq` set to its position.
///
/// Some documents lack `k` when `allow_missing` is set.
pub fn keyed_documents_strategy(
    keys: i64,
    max_len: usize,
    allow_missing: bool,
) -> impl Strategy<Value = Vec<Document>> {
    let key = if allow_missing {
        prop::option::weighted(0.8, 0..keys).boxed()
    } else {
        (0..keys).prop_map(Some).boxed()
    };

    prop::collection::vec(key, 0..max_len).prop_map(|keys| {
        keys.into_iter()
            .enumerate()
            .map(|(seq, k)| {
                let mut document = Document::new();
                if let Some(k) = k {
                    document.insert("k".to_string(), Value::from(k));
                }
                document.insert("seq".to_string(), Value::from(seq));
                document
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn keyed_documents_are_sequenced() {
        let mut runner = TestRunner::default();
        let docs = keyed_documents_strategy(3, 20, false)
            .new_tree(&mut runner)
            .unwrap()
            .current();

        for (i, document) in docs.iter().enumerate() {
            assert_eq!(document["seq"], Value::from(i));
            assert!(document["k"].as_i64().is_some_and(|k| (0..3).contains(&k)));
        }
    }

    proptest! {
        #[test]
        fn names_are_valid(name in name_strategy()) {
            prop_assert!(amazedb_core::validate_name("table", &name).is_ok());
        }
    }
}
