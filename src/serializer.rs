//! Versioned JSON load/save: spec.md §4.9 and §6.
//!
//! Grounded on the teacher's `OutputFormatter::save_to_file` (serde_json
//! round-trip of a `ScanResult`), generalized to the index-based file-list
//! format spec.md §6 specifies so group members don't duplicate path/size
//! data. Loaded fingerprints are trusted for *display* only — any
//! subsequent keep-one action re-verifies sizes via `stat` (see
//! [`stale_members`]) before trusting a loaded result enough to delete
//! anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DuplicateFinderError;
use crate::filters::Filters;
use crate::model::{Boost, DedupResult, DuplicateGroup, FileRecord, Mode, ScanResult};

const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct JsonFilters {
    min_size: u64,
    max_size: u64,
    extensions: Vec<String>,
    excluded_dirs: Vec<PathBuf>,
    priority_dirs: Vec<PathBuf>,
}

#[derive(Serialize, Deserialize)]
struct JsonFile {
    path: PathBuf,
    size: u64,
    mtime: Option<i64>,
    front: Option<String>,
    middle: Option<String>,
    end: Option<String>,
    full: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonGroup {
    size: u64,
    mode: Mode,
    members: Vec<usize>,
}

#[derive(Serialize, Deserialize)]
struct JsonReport {
    schema: u32,
    filters: JsonFilters,
    files: Vec<JsonFile>,
    mode: Option<Mode>,
    boost: Option<BoostName>,
    groups: Vec<JsonGroup>,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum BoostName {
    Size,
    Extension,
    Filename,
    FuzzyFilename,
}

impl From<Boost> for BoostName {
    fn from(b: Boost) -> Self {
        match b {
            Boost::Size => BoostName::Size,
            Boost::SizeExt => BoostName::Extension,
            Boost::SizeFilename => BoostName::Filename,
            Boost::SizeFuzzyFilename => BoostName::FuzzyFilename,
        }
    }
}

impl From<BoostName> for Boost {
    fn from(b: BoostName) -> Self {
        match b {
            BoostName::Size => Boost::Size,
            BoostName::Extension => Boost::SizeExt,
            BoostName::Filename => Boost::SizeFilename,
            BoostName::FuzzyFilename => Boost::SizeFuzzyFilename,
        }
    }
}

fn hex(value: Option<u64>) -> Option<String> {
    value.map(|v| format!("{v:016x}"))
}

fn unhex(value: &Option<String>) -> Result<Option<u64>, DuplicateFinderError> {
    match value {
        None => Ok(None),
        Some(s) => u64::from_str_radix(s, 16)
            .map(Some)
            .map_err(|e| DuplicateFinderError::CorruptedResult(format!("bad digest {s:?}: {e}"))),
    }
}

/// Serializes `scan` and (optionally) the groups found in `dedup` to `path`.
pub fn save(
    scan: &ScanResult,
    dedup: Option<&DedupResult>,
    path: &Path,
) -> Result<(), DuplicateFinderError> {
    let mut index_of: HashMap<&Path, usize> = HashMap::with_capacity(scan.files.len());
    let files: Vec<JsonFile> = scan
        .files
        .iter()
        .enumerate()
        .map(|(i, f)| {
            index_of.insert(f.path.as_path(), i);
            JsonFile {
                path: f.path.clone(),
                size: f.size,
                mtime: f.mtime,
                front: hex(f.front.get().copied()),
                middle: hex(f.middle.get().copied()),
                end: hex(f.end.get().copied()),
                full: hex(f.full.get().copied()),
            }
        })
        .collect();

    let groups = dedup
        .map(|d| {
            d.groups
                .iter()
                .filter_map(|g| {
                    let members: Option<Vec<usize>> = g
                        .members
                        .iter()
                        .map(|m| index_of.get(m.path.as_path()).copied())
                        .collect();
                    members.map(|members| JsonGroup {
                        size: g.size,
                        mode: g.mode,
                        members,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let report = JsonReport {
        schema: SCHEMA_VERSION,
        filters: JsonFilters {
            min_size: scan.filters.min_size,
            max_size: scan.filters.max_size,
            extensions: scan.filters.extensions.iter().cloned().collect(),
            excluded_dirs: scan.filters.excluded_dirs.iter().cloned().collect(),
            priority_dirs: scan.filters.priority_dirs.iter().cloned().collect(),
        },
        files,
        mode: dedup.map(|d| d.mode),
        boost: dedup.map(|d| d.boost.into()),
        groups,
    };

    let content = serde_json::to_string_pretty(&report)
        .map_err(|e| DuplicateFinderError::CorruptedResult(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| DuplicateFinderError::UsageError(e.to_string()))
}

/// Loads a previously-saved report, rebuilding a [`ScanResult`] and
/// [`DedupResult`] without re-hashing anything.
pub fn load(path: &Path) -> Result<(ScanResult, DedupResult), DuplicateFinderError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DuplicateFinderError::CorruptedResult(e.to_string()))?;
    let report: JsonReport = serde_json::from_str(&content)
        .map_err(|e| DuplicateFinderError::CorruptedResult(e.to_string()))?;

    if report.schema != SCHEMA_VERSION {
        return Err(DuplicateFinderError::CorruptedResult(format!(
            "unsupported schema version {} (expected {SCHEMA_VERSION})",
            report.schema
        )));
    }

    let mut total_bytes = 0u64;
    let mut records = Vec::with_capacity(report.files.len());
    for f in &report.files {
        let record = FileRecord::new(f.path.clone(), f.size, f.mtime);
        if let Some(v) = unhex(&f.front)? {
            record.set_front(v);
        }
        if let Some(v) = unhex(&f.middle)? {
            record.set_middle(v);
        }
        if let Some(v) = unhex(&f.end)? {
            record.set_end(v);
        }
        if let Some(v) = unhex(&f.full)? {
            record.set_full(v);
        }
        total_bytes += f.size;
        records.push(Arc::new(record));
    }

    let filters = Filters {
        min_size: report.filters.min_size,
        max_size: report.filters.max_size,
        extensions: report.filters.extensions.into_iter().collect(),
        excluded_dirs: report.filters.excluded_dirs.into_iter().collect(),
        priority_dirs: report.filters.priority_dirs.into_iter().collect(),
    };

    let mut groups = Vec::with_capacity(report.groups.len());
    for g in &report.groups {
        let mut members = Vec::with_capacity(g.members.len());
        for &idx in &g.members {
            let record = records.get(idx).ok_or_else(|| {
                DuplicateFinderError::CorruptedResult(format!("group member index {idx} out of range"))
            })?;
            members.push(Arc::clone(record));
        }
        groups.push(DuplicateGroup {
            size: g.size,
            members,
            mode: g.mode,
        });
    }

    let scan = ScanResult {
        files: records,
        filters,
        total_bytes,
    };
    let dedup = DedupResult {
        groups,
        mode: report.mode.unwrap_or(Mode::Normal),
        boost: report.boost.map(Into::into).unwrap_or(Boost::Size),
    };

    Ok((scan, dedup))
}

/// Re-verifies a loaded group's members against the live filesystem, per
/// spec.md §4.9: "any subsequent Keep One action must re-verify sizes via
/// `stat`". Returns the members whose current size no longer matches the
/// recorded size (or that vanished); callers should drop these from the
/// group before trashing anyone.
pub async fn stale_members(group: &DuplicateGroup) -> Vec<Arc<FileRecord>> {
    let mut stale = Vec::new();
    for member in &group.members {
        match tokio::fs::metadata(&member.path).await {
            Ok(meta) if meta.len() == member.size => {}
            _ => stale.push(Arc::clone(member)),
        }
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::Deduplicator;
    use crate::model::Mode;
    use crate::progress::{NoopSink, StopToken};

    #[tokio::test]
    async fn round_trip_preserves_dedup_result() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"hello").await.unwrap();
        tokio::fs::write(dir.path().join("c.txt"), b"world").await.unwrap();

        let scanner = crate::scanner::Scanner::new(
            Filters::default(),
            StopToken::new(),
            Arc::new(NoopSink),
        );
        let scan = scanner.scan(dir.path()).await.unwrap();

        let dedup_engine = Deduplicator::new(
            Mode::Normal,
            Boost::Size,
            4,
            StopToken::new(),
            Arc::new(NoopSink),
        );
        let dedup = dedup_engine.run(scan.files.clone()).await;
        assert_eq!(dedup.groups.len(), 1);

        let json_path = dir.path().join("report.json");
        save(&scan, Some(&dedup), &json_path).unwrap();
        let (scan2, dedup2) = load(&json_path).unwrap();

        assert_eq!(scan.files.len(), scan2.files.len());
        assert_eq!(dedup.groups.len(), dedup2.groups.len());
        assert_eq!(dedup.groups[0].size, dedup2.groups[0].size);
        assert_eq!(
            dedup.groups[0].members.len(),
            dedup2.groups[0].members.len()
        );
        assert_eq!(dedup.mode, dedup2.mode);
        assert_eq!(dedup.boost, dedup2.boost);

        // Running it twice on the unchanged tree should serialize identically.
        let json_path2 = dir.path().join("report2.json");
        save(&scan2, Some(&dedup2), &json_path2).unwrap();
        let a = std::fs::read_to_string(&json_path).unwrap();
        let b = std::fs::read_to_string(&json_path2).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mode_survives_round_trip_even_with_zero_groups() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"world").await.unwrap();

        let scanner = crate::scanner::Scanner::new(
            Filters::default(),
            StopToken::new(),
            Arc::new(NoopSink),
        );
        let scan = scanner.scan(dir.path()).await.unwrap();

        let dedup_engine = Deduplicator::new(
            Mode::Fast,
            Boost::Size,
            4,
            StopToken::new(),
            Arc::new(NoopSink),
        );
        let dedup = dedup_engine.run(scan.files.clone()).await;
        assert!(dedup.groups.is_empty());
        assert_eq!(dedup.mode, Mode::Fast);

        let json_path = dir.path().join("report.json");
        save(&scan, Some(&dedup), &json_path).unwrap();
        let (_scan2, dedup2) = load(&json_path).unwrap();

        assert_eq!(dedup2.mode, Mode::Fast);
    }

    #[test]
    fn corrupted_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"schema":99,"filters":{"min_size":1,"max_size":1,"extensions":[],"excluded_dirs":[],"priority_dirs":[]},"files":[],"boost":null,"groups":[]}"#).unwrap();
        let result = load(&path);
        assert!(matches!(
            result,
            Err(DuplicateFinderError::CorruptedResult(_))
        ));
    }
}
