//! Within-group total ordering for keep-one selection: spec.md §4.6.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::filters::Filters;
use crate::model::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ShortestPath,
    ShortestFilename,
}

impl std::str::FromStr for SortKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shortest-path" => Ok(SortKey::ShortestPath),
            "shortest-filename" => Ok(SortKey::ShortestFilename),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

fn path_components_len(record: &FileRecord) -> usize {
    record.path.components().count()
}

fn basename_len(record: &FileRecord) -> usize {
    record.basename().len()
}

/// Total order comparator per spec.md §4.6: priority class first, then the
/// selected sort key, then path length/name as tie-breaks, then the full
/// path as a last-resort tie-break (paths are unique in a valid scan, so
/// this final comparison never actually ties).
fn compare(a: &FileRecord, b: &FileRecord, filters: &Filters, sort_key: SortKey) -> Ordering {
    let priority_a = a.is_priority(filters);
    let priority_b = b.is_priority(filters);
    // priority files come first: true < false is backwards, so reverse.
    let priority_order = priority_b.cmp(&priority_a);
    if priority_order != Ordering::Equal {
        return priority_order;
    }

    let key_order = match sort_key {
        SortKey::ShortestPath => path_components_len(a)
            .cmp(&path_components_len(b))
            .then_with(|| basename_len(a).cmp(&basename_len(b))),
        SortKey::ShortestFilename => basename_len(a)
            .cmp(&basename_len(b))
            .then_with(|| path_components_len(a).cmp(&path_components_len(b))),
    };
    if key_order != Ordering::Equal {
        return key_order;
    }

    a.path.cmp(&b.path)
}

/// Sorts `members` in place per the ranker's total order. Stable, and
/// invariant under input permutation — the winner (`members[0]` afterward)
/// never depends on the order the group arrived in.
pub fn rank(members: &mut [Arc<FileRecord>], filters: &Filters, sort_key: SortKey) {
    members.sort_by(|a, b| compare(a, b, filters, sort_key));
}
