//! Comic-domain types shared between the archive reader, the metadata
//! resolver, the store, and the scanner.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ScanRunId;
use crate::natural::natural_cmp;

// ---------------------------------------------------------------------------
// IssueNumber
// ---------------------------------------------------------------------------

/// An issue number as printed on the cover: `"12"`, `"012"`, `"1.5"`,
/// `"12AU"`, `"Annual"`.
///
/// Ordering is numeric first (`"9" < "10"`, `"1" < "1.5"`), then by the
/// non-numeric remainder, and numbers without a numeric prefix sort after
/// all numbered issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueNumber(String);

impl IssueNumber {
    /// Placeholder used when nothing yields a number.
    pub const PLACEHOLDER: &'static str = "0";

    /// Normalize raw issue text. Leading `#` and surrounding whitespace are
    /// dropped; an empty result becomes the placeholder.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches('#').trim();
        if trimmed.is_empty() {
            Self(Self::PLACEHOLDER.to_string())
        } else {
            Self(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric prefix (`"12.5b"` → `12.5`), `None` for `"Annual"`.
    pub fn numeric_value(&self) -> Option<f64> {
        let (number, _) = self.split();
        number.and_then(|n| n.parse::<f64>().ok())
    }

    /// Lowercased remainder after the numeric prefix (`"12AU"` → `"au"`).
    pub fn suffix(&self) -> String {
        let (_, rest) = self.split();
        rest.trim().to_lowercase()
    }

    fn split(&self) -> (Option<&str>, &str) {
        let s = self.0.as_str();
        let int_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        if int_end == 0 {
            return (None, s);
        }
        let mut end = int_end;
        let rest = &s[int_end..];
        if let Some(frac) = rest.strip_prefix('.') {
            let frac_len = frac
                .char_indices()
                .find(|(_, c)| !c.is_ascii_digit())
                .map(|(i, _)| i)
                .unwrap_or(frac.len());
            if frac_len > 0 {
                end = int_end + 1 + frac_len;
            }
        }
        (Some(&s[..end]), &s[end..])
    }
}

impl Ord for IssueNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_value = match (self.numeric_value(), other.numeric_value()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_value
            .then_with(|| natural_cmp(&self.suffix(), &other.suffix()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for IssueNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Metadata records
// ---------------------------------------------------------------------------

/// Descriptive metadata embedded inside an archive (ComicInfo.xml).
///
/// Every field is optional; empty strings are normalized to `None` by the
/// reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    pub series: Option<String>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub volume: Option<i32>,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub page_count: Option<u32>,
    /// Zero-based index of the page marked as front cover.
    pub cover_page: Option<u32>,
}

/// Fully resolved metadata for one archive. Every archive gets one, even
/// if it only contains placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetadata {
    /// Display name of the series (case preserved).
    pub series: String,
    /// Canonical key the series id is derived from.
    pub series_key: String,
    /// Name used for ordering when it differs from `series` ("The Boys" → "Boys").
    pub sort_name: Option<String>,
    pub number: IssueNumber,
    pub title: Option<String>,
    pub volume: Option<i32>,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub page_count: u32,
    pub cover_page: Option<u32>,
}

// ---------------------------------------------------------------------------
// File identity
// ---------------------------------------------------------------------------

/// Filesystem facts recorded per archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    /// Modification time as unix seconds, if the platform reports one.
    pub modified: Option<i64>,
}

/// Cheap change-detection signature for an archive.
///
/// `sig:<size>:<mtime>` normally; `sha256:<hex>` when the modification time
/// is unavailable or hashing is forced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Signature from size and modification time.
    pub fn signature(size: u64, modified: i64) -> Self {
        Self(format!("sig:{size}:{modified}"))
    }

    /// Identity from a hex-encoded content digest.
    pub fn digest(hex: &str) -> Self {
        Self(format!("sha256:{hex}"))
    }

    /// Wrap a value previously read back from the database.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_digest(&self) -> bool {
        self.0.starts_with("sha256:")
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Discovery output
// ---------------------------------------------------------------------------

/// An archive found on disk, opened and resolved, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredComic {
    pub path: PathBuf,
    pub stat: FileStat,
    pub content_id: ContentId,
    pub metadata: NormalizedMetadata,
}

impl DiscoveredComic {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One entry of a discovery batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScannedFile {
    /// The indexed signature matched; the archive was not reopened.
    Unchanged { path: PathBuf },
    /// New or changed archive with freshly resolved metadata.
    Changed(DiscoveredComic),
}

impl ScannedFile {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ScannedFile::Unchanged { path } => path,
            ScannedFile::Changed(comic) => &comic.path,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan runs
// ---------------------------------------------------------------------------

/// Which part of the library a rescan covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanMode {
    /// Every configured root; issues missing anywhere are retired.
    Full,
    /// Only the given paths (all roots when empty); retirement never leaves
    /// them.
    Incremental { paths: Vec<PathBuf> },
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Full => "full",
            ScanMode::Incremental { .. } => "incremental",
        }
    }
}

/// Lifecycle status of a scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
            ScanStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ScanStatus::Running),
            "completed" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            "cancelled" => Some(ScanStatus::Cancelled),
            _ => None,
        }
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    pub discovered: u64,
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub retired: u64,
    pub failed: u64,
    pub conflicts: u64,
}

impl ScanCounts {
    /// Fold another set of counters into this one.
    pub fn merge(&mut self, other: &ScanCounts) {
        self.discovered += other.discovered;
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.retired += other.retired;
        self.failed += other.failed;
        self.conflicts += other.conflicts;
    }

    /// True when the run changed nothing in the database.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.retired == 0
    }
}

/// Summary of one scanner execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: ScanRunId,
    pub mode: String,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: ScanCounts,
    pub error: Option<String>,
}

impl ScanRun {
    /// A freshly started run.
    pub fn start(mode: &ScanMode) -> Self {
        Self {
            id: ScanRunId::new(),
            mode: mode.as_str().to_string(),
            status: ScanStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            counts: ScanCounts::default(),
            error: None,
        }
    }

    /// Close the run with a final status.
    pub fn finish(&mut self, status: ScanStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }
}
