//! Generic bucketing primitive: spec.md §4.3.
//!
//! Reused by boost-key grouping and by every hashing stage in [`crate::dedup`].
//! Its only requirement is that the key function is pure and cheap (or
//! already cached, as the fingerprint slots are).

use std::collections::HashMap;
use std::hash::Hash;

/// Buckets `items` by `key_fn`, then drops every bucket with fewer than two
/// entries. Bucket (and item) order is unspecified.
pub fn group_by<T, K, F>(items: Vec<T>, key_fn: F) -> Vec<Vec<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut buckets: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        let key = key_fn(&item);
        buckets.entry(key).or_default().push(item);
    }
    buckets
        .into_values()
        .filter(|bucket| bucket.len() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_dropped() {
        let groups = group_by(vec![1, 2, 3, 4, 5], |n| n % 3);
        // 1,4 -> key 1 ; 2,5 -> key 2 ; 3 -> key 0 (singleton, dropped)
        assert_eq!(groups.len(), 2);
        for g in &groups {
            assert_eq!(g.len(), 2);
        }
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups: Vec<Vec<i32>> = group_by(vec![], |n: &i32| *n);
        assert!(groups.is_empty());
    }

    #[test]
    fn all_same_key_makes_one_group() {
        let groups = group_by(vec!["a", "b", "c"], |_| 0);
        assert_eq!(groups, vec![vec!["a", "b", "c"]]);
    }
}
