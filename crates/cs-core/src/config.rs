//! JSON configuration.
//!
//! Every field has a default, so `{}` is a complete config and a file only
//! needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Everything `comicshelf` reads from its config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub scan: ScanConfig,
    pub metadata: MetadataConfig,
    pub storage: StorageConfig,
    pub thumbnails: ThumbnailConfig,
}

impl Config {
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Best-effort load: a missing, unreadable or malformed file is logged
    /// and replaced by the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = path.map(|p| (p, std::fs::read_to_string(p)));
        match loaded {
            None => Self::default(),
            Some((p, Ok(text))) => match Self::from_json(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "Ignoring malformed config");
                    Self::default()
                }
            },
            Some((p, Err(e))) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %p.display(), "Config file absent, running with defaults");
                Self::default()
            }
            Some((p, Err(e))) => {
                tracing::warn!(path = %p.display(), error = %e, "Config file unreadable");
                Self::default()
            }
        }
    }

    /// Problems worth telling the user about. None of them stop the binary.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.library.roots.is_empty() {
            warnings.push("library.roots is empty; scans will find nothing".into());
        }

        for (i, root) in self.library.roots.iter().enumerate() {
            if root.is_relative() {
                warnings.push(format!(
                    "library.roots[{i}] '{}' is relative; it resolves against the working directory",
                    root.display()
                ));
            }
            let nested = self
                .library
                .roots
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && root != other && root.starts_with(other));
            if nested {
                warnings.push(format!(
                    "library.roots[{i}] '{}' is nested inside another root",
                    root.display()
                ));
            }
        }

        if self.library.extensions.is_empty() {
            warnings.push("library.extensions is empty; no files will match".into());
        }
        for ext in &self.library.extensions {
            if ext.starts_with('.') {
                warnings.push(format!(
                    "library.extensions entry '{ext}' should not include a leading dot"
                ));
            }
        }

        if !self.metadata.use_embedded && !self.metadata.directory_fallback {
            warnings.push(
                "metadata.use_embedded and metadata.directory_fallback are both off; \
                 only filenames will be used"
                    .into(),
            );
        }

        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            warnings.push("thumbnails.max_width/max_height must be greater than 0".into());
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            warnings.push(format!(
                "thumbnails.quality {} is outside 1..=100",
                self.thumbnails.quality
            ));
        }

        warnings
    }
}

/// Which directories make up the library and what counts as a comic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    pub follow_links: bool,
}

fn default_extensions() -> Vec<String> {
    ["cbz", "zip", "cbr", "rar"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: default_extensions(),
            follow_links: true,
        }
    }
}

impl LibraryConfig {
    /// Case-insensitive extension match against the configured list.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Scanner behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Run a full scan when the binary starts.
    pub on_startup: bool,
    /// Always hash archive contents instead of trusting size + mtime.
    pub force_hash: bool,
}

/// Order in which the embedded and filename strategies are consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataPrecedence {
    #[default]
    EmbeddedFirst,
    FilenameFirst,
}

/// Metadata resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub precedence: MetadataPrecedence,
    #[serde(default = "default_true")]
    pub use_embedded: bool,
    #[serde(default = "default_true")]
    pub directory_fallback: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            precedence: MetadataPrecedence::default(),
            use_embedded: true,
            directory_fallback: true,
        }
    }
}

/// Where the database and the scan marker live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
}

fn default_db_file() -> String {
    "comicshelf.db".into()
}
fn default_lock_file() -> String {
    "scan.lock".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_file: default_db_file(),
            lock_file: default_lock_file(),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(&self.lock_file)
    }
}

/// Cover thumbnail rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 300,
            max_height: 450,
            quality: 80,
        }
    }
}
