//! Sorting and searching over document sequences.
//!
//! Tables keep no persistent index. Ordered access is computed per call with
//! a stable top-down merge sort, and equality lookups on a single field use a
//! lower-bound binary search over the freshly sorted sequence.

use crate::document::{compare_values, values_equal, Document};
use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::cmp::Ordering;

/// Stable merge sort.
///
/// Elements that compare `Equal` keep their input order.
pub fn merge_sort_by<T, F>(items: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }

    let mut left = items;
    let right = left.split_off(left.len() / 2);
    merge(merge_sort_by(left, compare), merge_sort_by(right, compare), compare)
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut result = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_left = match (left.peek(), right.peek()) {
            // Ties go left to keep the sort stable.
            (Some(l), Some(r)) => compare(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        result.extend(next);
    }

    result
}

/// Sorts documents ascending by `field`.
///
/// # Errors
///
/// Returns [`CoreError::SortFieldMissing`] if any document lacks `field`;
/// nothing is dropped or reordered in that case.
pub fn sort_by_field(documents: Vec<Document>, field: &str) -> CoreResult<Vec<Document>> {
    if documents.iter().any(|doc| !doc.contains_key(field)) {
        return Err(CoreError::sort_field_missing(field));
    }

    Ok(merge_sort_by(documents, &|a: &Document, b: &Document| {
        match (a.get(field), b.get(field)) {
            (Some(x), Some(y)) => compare_values(x, y),
            _ => Ordering::Equal,
        }
    }))
}

/// Returns the first index whose element compares `Equal`.
///
/// `compare` checks an element against the target. The slice must be sorted
/// consistently with it; on an unsorted slice the result is unspecified.
pub fn binary_search_by<T, F>(items: &[T], compare: F) -> Option<usize>
where
    F: Fn(&T) -> Ordering,
{
    let (mut low, mut high) = (0, items.len());
    while low < high {
        let mid = low + (high - low) / 2;
        if compare(&items[mid]) == Ordering::Less {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    (low < items.len() && compare(&items[low]) == Ordering::Equal).then_some(low)
}

/// Finds the first document in `documents` whose `field` equals `value`.
///
/// `documents` must be sorted ascending by `field` (for example by
/// [`sort_by_field`]).
///
/// # Errors
///
/// Returns [`CoreError::SortFieldMissing`] if a compared document lacks
/// `field`, which means the precondition was violated.
pub fn search_by_field<'a>(
    documents: &'a [Document],
    field: &str,
    value: &Value,
) -> CoreResult<Option<&'a Document>> {
    if documents.iter().any(|doc| !doc.contains_key(field)) {
        return Err(CoreError::sort_field_missing(field));
    }

    let index = binary_search_by(documents, |doc| match doc.get(field) {
        Some(v) => compare_values(v, value),
        None => Ordering::Less,
    });

    Ok(index
        .map(|i| &documents[i])
        .filter(|doc| doc.get(field).is_some_and(|v| values_equal(v, value))))
}

/// Positions of `documents` in ascending `field` order, ties in input order.
///
/// # Errors
///
/// Returns [`CoreError::SortFieldMissing`] if any document lacks `field`.
pub fn order_by_field(documents: &[Document], field: &str) -> CoreResult<Vec<usize>> {
    let keyed = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| doc.get(field).map(|v| (i, v)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CoreError::sort_field_missing(field))?;

    Ok(sorted_positions(keyed))
}

/// Position of the first document (in input order) whose `field` equals
/// `value`, found by sorting on `field` and binary searching.
///
/// Documents without `field` can never match and are left out of the sort.
pub fn find_equal(documents: &[Document], field: &str, value: &Value) -> Option<usize> {
    let keyed: Vec<(usize, &Value)> = documents
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| doc.get(field).map(|v| (i, v)))
        .collect();

    let sorted = merge_sort_by(keyed, &|a: &(usize, &Value), b: &(usize, &Value)| {
        compare_values(a.1, b.1)
    });
    binary_search_by(&sorted, |(_, v)| compare_values(v, value))
        .map(|pos| sorted[pos])
        .filter(|(_, v)| values_equal(v, value))
        .map(|(i, _)| i)
}

fn sorted_positions(keyed: Vec<(usize, &Value)>) -> Vec<usize> {
    merge_sort_by(keyed, &|a: &(usize, &Value), b: &(usize, &Value)| {
        compare_values(a.1, b.1)
    })
    .into_iter()
    .map(|(i, _)| i)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn sort_orders_by_field() {
        let docs = vec![
            doc(json!({"n": 3})),
            doc(json!({"n": 1})),
            doc(json!({"n": 2})),
        ];
        let sorted = sort_by_field(docs, "n").unwrap();
        let keys: Vec<_> = sorted.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(keys, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn sort_is_stable() {
        let docs = vec![
            doc(json!({"k": 2, "tag": "first"})),
            doc(json!({"k": 1, "tag": "x"})),
            doc(json!({"k": 2, "tag": "second"})),
            doc(json!({"k": 1, "tag": "y"})),
            doc(json!({"k": 2, "tag": "third"})),
        ];
        let sorted = sort_by_field(docs, "k").unwrap();
        let tags: Vec<_> = sorted.iter().map(|d| d["tag"].as_str().unwrap()).collect();
        assert_eq!(tags, vec!["x", "y", "first", "second", "third"]);
    }

    #[test]
    fn sort_fails_when_field_missing() {
        let docs = vec![doc(json!({"k": 1})), doc(json!({"other": 2}))];
        assert!(matches!(
            sort_by_field(docs, "k"),
            Err(CoreError::SortFieldMissing { field }) if field == "k"
        ));
    }

    #[test]
    fn sort_empty_and_single() {
        assert!(sort_by_field(Vec::new(), "k").unwrap().is_empty());
        let one = sort_by_field(vec![doc(json!({"k": 1}))], "k").unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn merge_sort_matches_std_sort() {
        let input: Vec<i32> = vec![5, -1, 3, 3, 0, 9, -7, 2, 2, 8];
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(merge_sort_by(input, &|a: &i32, b: &i32| a.cmp(b)), expected);
    }

    #[test]
    fn binary_search_finds_first_match() {
        let items = [1, 2, 2, 2, 5];
        assert_eq!(binary_search_by(&items, |x| x.cmp(&2)), Some(1));
        assert_eq!(binary_search_by(&items, |x| x.cmp(&5)), Some(4));
        assert_eq!(binary_search_by(&items, |x| x.cmp(&3)), None);
        assert_eq!(binary_search_by(&items, |x| x.cmp(&9)), None);
    }

    #[test]
    fn binary_search_empty_is_none() {
        let items: [i32; 0] = [];
        assert_eq!(binary_search_by(&items, |x| x.cmp(&1)), None);
        assert!(search_by_field(&[], "k", &json!(1)).unwrap().is_none());
    }

    #[test]
    fn search_by_field_returns_first_equal() {
        let sorted = sort_by_field(
            vec![
                doc(json!({"k": 2, "tag": "a"})),
                doc(json!({"k": 1})),
                doc(json!({"k": 2, "tag": "b"})),
            ],
            "k",
        )
        .unwrap();

        let found = search_by_field(&sorted, "k", &json!(2)).unwrap().unwrap();
        assert_eq!(found["tag"], json!("a"));
        assert!(search_by_field(&sorted, "k", &json!(3)).unwrap().is_none());
    }

    #[test]
    fn order_by_field_keeps_ties_in_input_order() {
        let docs = vec![
            doc(json!({"k": "b"})),
            doc(json!({"k": "a"})),
            doc(json!({"k": "b"})),
            doc(json!({"k": "a"})),
        ];
        assert_eq!(order_by_field(&docs, "k").unwrap(), vec![1, 3, 0, 2]);

        let missing = vec![doc(json!({"k": 1})), doc(json!({}))];
        assert!(matches!(
            order_by_field(&missing, "k"),
            Err(CoreError::SortFieldMissing { .. })
        ));
    }

    #[test]
    fn find_equal_skips_documents_without_field() {
        let docs = vec![
            doc(json!({"other": 1})),
            doc(json!({"k": 7, "tag": "first"})),
            doc(json!({"k": 3})),
            doc(json!({"k": 7, "tag": "second"})),
        ];
        assert_eq!(find_equal(&docs, "k", &json!(7)), Some(1));
        assert_eq!(find_equal(&docs, "k", &json!(7.0)), Some(1));
        assert_eq!(find_equal(&docs, "k", &json!(4)), None);
        assert_eq!(find_equal(&docs, "missing", &json!(1)), None);
    }

    #[test]
    fn search_distinguishes_false_from_not_found() {
        let sorted = sort_by_field(
            vec![doc(json!({"flag": false})), doc(json!({"flag": true}))],
            "flag",
        )
        .unwrap();

        let found = search_by_field(&sorted, "flag", &json!(false)).unwrap();
        assert_eq!(found.map(|d| d["flag"].clone()), Some(json!(false)));
    }
}
