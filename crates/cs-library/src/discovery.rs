//! Filesystem walk that turns one root into a batch of [`ScannedFile`]s.
//!
//! Discovery is blocking and never touches the database: the caller passes
//! in the indexed content identities for the root and gets back an
//! in-memory batch for reconciliation.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

use cs_core::config::LibraryConfig;
use cs_core::natural::natural_cmp;
use cs_core::{ContentId, DiscoveredComic, Error, FileStat, Result, ScannedFile};
use cs_metadata::{ResolveInput, Resolver};

/// Suffixes of files still being written by a downloader or copier.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".partial", ".crdownload", ".download", ".tmp", ".aria2"];

/// Settings that shape one discovery walk.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions<'a> {
    pub library: &'a LibraryConfig,
    pub force_hash: bool,
}

/// An archive that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of walking one root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub entries: Vec<ScannedFile>,
    pub failures: Vec<FileFailure>,
}

/// Walk `root` and build its batch.
///
/// `known` maps indexed paths to their stored content identity; a match
/// short-circuits to [`ScannedFile::Unchanged`] without opening the archive.
/// A missing or unreadable root is an error; anything that goes wrong with
/// a single file is recorded in [`Discovery::failures`].
pub fn discover(
    root: &Path,
    known: &HashMap<PathBuf, ContentId>,
    options: &DiscoveryOptions<'_>,
    resolver: &Resolver,
) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    let candidates = collect_candidates(root, options, &mut discovery.failures)?;

    // Group by directory so ordinals count siblings in natural order.
    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for path in candidates {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        by_dir.entry(parent).or_default().push(path);
    }

    let mut known_per_dir: HashMap<&Path, usize> = HashMap::new();
    for path in known.keys() {
        if let Some(parent) = path.parent() {
            *known_per_dir.entry(parent).or_default() += 1;
        }
    }

    for (dir, mut siblings) in by_dir {
        // Ordinals shift when a sibling comes or goes, so nothing in the
        // directory may keep its stored number unseen.
        let membership_changed = known_per_dir.get(dir.as_path()).copied().unwrap_or(0)
            != siblings.len()
            || siblings.iter().any(|p| !known.contains_key(p));
        if membership_changed {
            tracing::debug!(dir = %dir.display(), "Directory membership changed, re-resolving");
        }

        siblings.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
        for (i, path) in siblings.into_iter().enumerate() {
            let ordinal = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let trust_known = !membership_changed;
            match inspect(&path, ordinal, trust_known, known, options, resolver) {
                Ok(entry) => discovery.entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable archive");
                    discovery.failures.push(FileFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        entries = discovery.entries.len(),
        failures = discovery.failures.len(),
        "Discovery finished"
    );
    Ok(discovery)
}

/// Paths of every candidate archive under `root`, in walk order.
fn collect_candidates(
    root: &Path,
    options: &DiscoveryOptions<'_>,
    failures: &mut Vec<FileFailure>,
) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root).map_err(|e| Error::root_unavailable(root, e))?;
    if meta.is_file() {
        return Ok(if is_candidate_name(root, options.library) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }
    if !meta.is_dir() {
        return Err(Error::root_unavailable(root, "not a directory"));
    }
    std::fs::read_dir(root).map_err(|e| Error::root_unavailable(root, e))?;

    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(options.library.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "Error walking directory");
                if let Some(path) = err.path() {
                    failures.push(FileFailure {
                        path: path.to_path_buf(),
                        message: err.to_string(),
                    });
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_candidate_name(entry.path(), options.library) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.') || s == "__MACOSX")
        .unwrap_or(false)
}

fn is_candidate_name(path: &Path, library: &LibraryConfig) -> bool {
    let name = file_name(path);
    if name.starts_with('.') {
        return false;
    }
    let lower = name.to_lowercase();
    if PARTIAL_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return false;
    }
    library.matches_extension(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Stat, identify and (if needed) open one archive. With `trust_known`
/// off the archive is opened even when its identity matches.
fn inspect(
    path: &Path,
    ordinal: u32,
    trust_known: bool,
    known: &HashMap<PathBuf, ContentId>,
    options: &DiscoveryOptions<'_>,
    resolver: &Resolver,
) -> Result<ScannedFile> {
    let stat = file_stat(path)?;
    let content_id = content_id(path, &stat, options.force_hash)?;

    if trust_known && known.get(path) == Some(&content_id) {
        return Ok(ScannedFile::Unchanged {
            path: path.to_path_buf(),
        });
    }

    let mut archive = cs_archive::open(path)?;
    let embedded = archive.embedded_metadata();
    let page_count = u32::try_from(archive.page_count()).unwrap_or(u32::MAX);
    let input = ResolveInput::new(path)
        .with_embedded(embedded.as_ref())
        .with_ordinal(ordinal)
        .with_page_count(page_count);
    let metadata = resolver.resolve(&input);

    tracing::trace!(
        path = %path.display(),
        series = %metadata.series,
        number = %metadata.number,
        pages = page_count,
        "Resolved archive"
    );

    Ok(ScannedFile::Changed(DiscoveredComic {
        path: path.to_path_buf(),
        stat,
        content_id,
        metadata,
    }))
}

pub(crate) fn file_stat(path: &Path) -> Result<FileStat> {
    let meta = std::fs::metadata(path)?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_secs()).ok());
    Ok(FileStat {
        size: meta.len(),
        modified,
    })
}

/// `sig:` identity from size and mtime, or a content digest when the mtime
/// is unavailable or hashing is forced.
pub(crate) fn content_id(path: &Path, stat: &FileStat, force_hash: bool) -> Result<ContentId> {
    match stat.modified {
        Some(mtime) if !force_hash => Ok(ContentId::signature(stat.size, mtime)),
        _ => {
            let mut file = File::open(path)?;
            let mut hasher = Sha256::new();
            io::copy(&mut file, &mut hasher)?;
            Ok(ContentId::digest(&hex::encode(hasher.finalize())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_cbz(path: &Path, pages: &[&str]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for page in pages {
            zip.start_file(*page, SimpleFileOptions::default()).unwrap();
            zip.write_all(b"not really an image").unwrap();
        }
        zip.finish().unwrap();
    }

    fn options(library: &LibraryConfig) -> DiscoveryOptions<'_> {
        DiscoveryOptions {
            library,
            force_hash: false,
        }
    }

    fn changed(entry: &ScannedFile) -> &DiscoveredComic {
        match entry {
            ScannedFile::Changed(c) => c,
            other => panic!("expected Changed, got {other:?}"),
        }
    }

    #[test]
    fn finds_archives_and_resolves_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_cbz(&dir.path().join("Saga/Saga 002.cbz"), &["01.jpg", "02.jpg"]);
        write_cbz(&dir.path().join("Saga/Saga 001.cbz"), &["01.jpg"]);
        std::fs::write(dir.path().join("Saga/notes.txt"), "x").unwrap();

        let library = LibraryConfig::default();
        let found = discover(dir.path(), &HashMap::new(), &options(&library), &Resolver::default())
            .unwrap();
        assert!(found.failures.is_empty());
        assert_eq!(found.entries.len(), 2);

        let first = changed(&found.entries[0]);
        assert_eq!(first.file_name(), "Saga 001.cbz");
        assert_eq!(first.metadata.series, "Saga");
        assert_eq!(first.metadata.page_count, 1);
        assert!(first.content_id.as_str().starts_with("sig:"));
    }

    #[test]
    fn ordinals_follow_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scan10.cbz", "scan2.cbz", "scan1.cbz"] {
            write_cbz(&dir.path().join("Loose").join(name), &["a.png"]);
        }
        let library = LibraryConfig::default();
        let found = discover(dir.path(), &HashMap::new(), &options(&library), &Resolver::default())
            .unwrap();
        let numbers: Vec<(String, String)> = found
            .entries
            .iter()
            .map(|e| {
                let c = changed(e);
                (c.file_name(), c.metadata.number.to_string())
            })
            .collect();
        // "scanN" has no separate issue number token, so the ordinal is used.
        assert_eq!(
            numbers,
            vec![
                ("scan1.cbz".to_string(), "1".to_string()),
                ("scan2.cbz".to_string(), "2".to_string()),
                ("scan10.cbz".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn known_identity_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A 1.cbz");
        write_cbz(&path, &["1.jpg"]);

        let stat = file_stat(&path).unwrap();
        let id = content_id(&path, &stat, false).unwrap();
        let known = HashMap::from([(path.clone(), id)]);

        let library = LibraryConfig::default();
        let found = discover(dir.path(), &known, &options(&library), &Resolver::default()).unwrap();
        assert_eq!(found.entries, vec![ScannedFile::Unchanged { path }]);
    }

    #[test]
    fn new_sibling_reopens_the_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loose = dir.path().join("Unsorted Comics");
        let mut known = HashMap::new();
        for name in ["alpha.cbz", "gamma.cbz"] {
            let path = loose.join(name);
            write_cbz(&path, &["1.png"]);
            let stat = file_stat(&path).unwrap();
            known.insert(path.clone(), content_id(&path, &stat, false).unwrap());
        }
        write_cbz(&loose.join("beta.cbz"), &["1.png"]);
        // An untouched directory next door still short-circuits.
        let other = dir.path().join("Saga/Saga 001.cbz");
        write_cbz(&other, &["1.png"]);
        let stat = file_stat(&other).unwrap();
        known.insert(other.clone(), content_id(&other, &stat, false).unwrap());

        let library = LibraryConfig::default();
        let found = discover(dir.path(), &known, &options(&library), &Resolver::default()).unwrap();

        let mut numbers = Vec::new();
        for entry in &found.entries {
            match entry {
                ScannedFile::Changed(c) => {
                    numbers.push((c.file_name(), c.metadata.number.to_string()))
                }
                ScannedFile::Unchanged { path } => assert_eq!(path, &other),
            }
        }
        assert_eq!(
            numbers,
            vec![
                ("alpha.cbz".to_string(), "1".to_string()),
                ("beta.cbz".to_string(), "2".to_string()),
                ("gamma.cbz".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn hidden_partial_and_foreign_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_cbz(&dir.path().join(".hidden/a 1.cbz"), &["1.jpg"]);
        write_cbz(&dir.path().join("._b 1.cbz"), &["1.jpg"]);
        write_cbz(&dir.path().join("c 1.cbz.part"), &["1.jpg"]);
        write_cbz(&dir.path().join("d 1.epub"), &["1.jpg"]);
        write_cbz(&dir.path().join("e 1.CBZ"), &["1.jpg"]);

        let library = LibraryConfig::default();
        let found = discover(dir.path(), &HashMap::new(), &options(&library), &Resolver::default())
            .unwrap();
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.entries[0].path(), dir.path().join("e 1.CBZ"));
    }

    #[test]
    fn corrupt_archive_is_a_file_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken 1.cbz"), b"PK\x03\x04 garbage").unwrap();
        write_cbz(&dir.path().join("fine 1.cbz"), &["1.jpg"]);

        let library = LibraryConfig::default();
        let found = discover(dir.path(), &HashMap::new(), &options(&library), &Resolver::default())
            .unwrap();
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.failures.len(), 1);
        assert!(found.failures[0].path.ends_with("broken 1.cbz"));
    }

    #[test]
    fn missing_root_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let library = LibraryConfig::default();
        let err = discover(
            &dir.path().join("nope"),
            &HashMap::new(),
            &options(&library),
            &Resolver::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::RootDirectoryUnavailable { .. }));
    }

    #[test]
    fn forced_hash_uses_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.cbz");
        std::fs::write(&path, b"abc").unwrap();
        let stat = file_stat(&path).unwrap();
        let id = content_id(&path, &stat, true).unwrap();
        assert_eq!(
            id.as_str(),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
