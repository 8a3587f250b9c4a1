//! Core data model: spec.md §3.
//!
//! [`FileRecord`] is immutable after the scan except for its fingerprint
//! slots, which are filled at most once per run. The slots use `OnceLock`
//! rather than a `Mutex` because each slot is written by exactly one task
//! during a given stage — there is no contention to arbitrate, only a
//! write-once guarantee to uphold.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::filters::Filters;

/// One discovered file and whatever content fingerprints have been computed
/// for it so far.
#[derive(Debug)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    /// Modification time, epoch seconds. `None` if the filesystem didn't report one.
    pub mtime: Option<i64>,
    pub front: OnceLock<u64>,
    pub middle: OnceLock<u64>,
    pub end: OnceLock<u64>,
    pub full: OnceLock<u64>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, mtime: Option<i64>) -> Self {
        Self {
            path,
            size,
            mtime,
            front: OnceLock::new(),
            middle: OnceLock::new(),
            end: OnceLock::new(),
            full: OnceLock::new(),
        }
    }

    /// Stores a digest into a slot if it hasn't been computed yet this run.
    /// Returns the value that ended up in the slot (the new one, or whatever
    /// raced it there first).
    pub fn set_front(&self, value: u64) -> u64 {
        *self.front.get_or_init(|| value)
    }
    pub fn set_middle(&self, value: u64) -> u64 {
        *self.middle.get_or_init(|| value)
    }
    pub fn set_end(&self, value: u64) -> u64 {
        *self.end.get_or_init(|| value)
    }
    pub fn set_full(&self, value: u64) -> u64 {
        *self.full.get_or_init(|| value)
    }

    pub fn basename(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn is_priority(&self, filters: &Filters) -> bool {
        filters.is_priority(&self.path)
    }
}

/// Which stage proved a [`DuplicateGroup`]'s membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fast,
    Normal,
    Full,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Fast => "fast",
            Mode::Normal => "normal",
            Mode::Full => "full",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Mode::Fast),
            "normal" => Ok(Mode::Normal),
            "full" => Ok(Mode::Full),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Initial grouping function applied before any content I/O (spec.md §4.5 Stage 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boost {
    Size,
    SizeExt,
    SizeFilename,
    SizeFuzzyFilename,
}

impl std::str::FromStr for Boost {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" => Ok(Boost::Size),
            "extension" => Ok(Boost::SizeExt),
            "filename" => Ok(Boost::SizeFilename),
            "fuzzy_filename" => Ok(Boost::SizeFuzzyFilename),
            other => Err(format!("unknown boost key: {other}")),
        }
    }
}

/// A set of files proven identical (to the degree the active [`Mode`] guarantees).
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub size: u64,
    pub members: Vec<std::sync::Arc<FileRecord>>,
    pub mode: Mode,
}

impl DuplicateGroup {
    /// Bytes recoverable by keeping exactly one member.
    pub fn recoverable_bytes(&self) -> u64 {
        self.size * (self.members.len().saturating_sub(1) as u64)
    }

    pub fn smallest_path(&self) -> Option<&Path> {
        self.members.iter().map(|m| m.path.as_path()).min()
    }
}

/// The ordered list of files a scan produced, plus the parameters used to produce it.
pub struct ScanResult {
    pub files: Vec<std::sync::Arc<FileRecord>>,
    pub filters: Filters,
    pub total_bytes: u64,
}

/// The ordered list of duplicate groups a dedup run produced.
pub struct DedupResult {
    pub groups: Vec<DuplicateGroup>,
    pub mode: Mode,
    pub boost: Boost,
}

impl DedupResult {
    /// Sorts groups by recoverable bytes desc, then size desc, then smallest
    /// member path asc — the tie-break chain spec.md §4.5 mandates for
    /// deterministic output.
    pub fn sort_canonical(&mut self) {
        self.groups.sort_by(|a, b| {
            b.recoverable_bytes()
                .cmp(&a.recoverable_bytes())
                .then_with(|| b.size.cmp(&a.size))
                .then_with(|| a.smallest_path().cmp(&b.smallest_path()))
        });
    }
}
