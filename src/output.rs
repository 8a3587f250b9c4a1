//! Human-readable and JSON rendering of a dedup run: spec.md §6.
//!
//! Grounded on the teacher's `OutputFormatter`, trimmed of the emoji-heavy
//! banner style in favor of spec.md §6's plain group listing, and
//! generalized to write through [`crate::serializer`] for JSON instead of
//! serializing the old `ScanResult`/`DuplicateGroup` types directly.

use std::path::Path;

use crate::filters::Filters;
use crate::model::{DedupResult, ScanResult};

/// Renders `result` the way spec.md §6 describes non-verbose text output:
/// a blank line, then one block per group of
/// `Group N (size=SIZE, members=K):` followed by one path per line,
/// priority-directory members prefixed with `*`.
pub fn format_text(result: &DedupResult, filters: &Filters) -> String {
    if result.groups.is_empty() {
        return "No duplicates found.\n".to_string();
    }

    let mut out = String::new();
    for (i, group) in result.groups.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!(
            "Group {} (size={}, members={}):\n",
            i + 1,
            format_bytes(group.size),
            group.members.len()
        ));
        for member in &group.members {
            let marker = if member.is_priority(filters) { "*" } else { " " };
            out.push_str(&format!("{marker} {}\n", member.path.display()));
        }
    }
    out
}

/// Summary line printed after the group listing (or alone, under `--keep-one`).
pub fn format_summary(scan: &ScanResult, result: &DedupResult) -> String {
    let recoverable: u64 = result.groups.iter().map(|g| g.recoverable_bytes()).sum();
    format!(
        "{} files scanned, {} duplicate groups, {} recoverable\n",
        scan.files.len(),
        result.groups.len(),
        format_bytes(recoverable)
    )
}

/// Saves `scan`/`result` as the versioned JSON report to `path`.
pub fn save_json(
    scan: &ScanResult,
    result: &DedupResult,
    path: &Path,
) -> Result<(), crate::error::DuplicateFinderError> {
    crate::serializer::save(scan, Some(result), path)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }
    if unit_index == 0 {
        format!("{bytes} {}", UNITS[unit_index])
    } else {
        format!("{value:.2} {}", UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Boost, DuplicateGroup, FileRecord, Mode};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn empty_groups_reports_no_duplicates() {
        let result = DedupResult {
            groups: vec![],
            mode: Mode::Normal,
            boost: Boost::Size,
        };
        assert_eq!(format_text(&result, &Filters::default()), "No duplicates found.\n");
    }

    #[test]
    fn text_format_marks_priority_members() {
        let mut filters = Filters::default();
        filters.priority_dirs.insert(PathBuf::from("/keep"));
        let group = DuplicateGroup {
            size: 1024,
            members: vec![
                Arc::new(FileRecord::new(PathBuf::from("/keep/a.txt"), 1024, None)),
                Arc::new(FileRecord::new(PathBuf::from("/other/b.txt"), 1024, None)),
            ],
            mode: Mode::Normal,
        };
        let result = DedupResult {
            groups: vec![group],
            mode: Mode::Normal,
            boost: Boost::Size,
        };
        let text = format_text(&result, &filters);
        assert!(text.contains("Group 1 (size=1.00 KB, members=2):"));
        assert!(text.contains("* /keep/a.txt"));
        assert!(text.contains("  /other/b.txt"));
    }
}
