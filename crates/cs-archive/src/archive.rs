//! The [`ComicArchive`] handle and the backend seam behind it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cs_core::natural::natural_cmp;
use cs_core::{EmbeddedMetadata, Error, Result};

use crate::comicinfo;
use crate::detect::{detect, Container};
use crate::thumbnail::{self, ThumbnailOptions};
use crate::zip_archive::ZipBackend;

/// File extensions treated as page images (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "avif", "jxl",
];

const COMIC_INFO: &str = "ComicInfo.xml";

/// One file inside a container, as listed by a backend.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub name: String,
    pub size: u64,
    /// Backend-specific position used to read the entry back.
    pub slot: usize,
}

/// Container-specific listing and extraction.
pub(crate) trait Backend: Send {
    /// Every non-directory entry. Entries whose headers cannot be read are
    /// skipped.
    fn entries(&mut self) -> Vec<Entry>;

    /// Read one entry's bytes. The error is a human-readable reason.
    fn read(&mut self, entry: &Entry) -> std::result::Result<Vec<u8>, String>;
}

/// A page of an archive in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Zero-based position in display order.
    pub index: usize,
    /// Entry name inside the container.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// True when `name` has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Hidden files, dot-directories, and macOS resource forks.
fn is_hidden(name: &str) -> bool {
    name.split(['/', '\\'])
        .any(|part| part.starts_with('.') || part == "__MACOSX")
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// An open comic archive.
///
/// Opening lists the container once; pages and the ComicInfo entry are
/// resolved up front, page bytes are read on demand.
pub struct ComicArchive {
    path: PathBuf,
    container: Container,
    backend: Box<dyn Backend>,
    pages: Vec<PageRef>,
    page_entries: Vec<Entry>,
    comic_info: Option<Entry>,
    metadata: Option<Option<EmbeddedMetadata>>,
}

impl ComicArchive {
    /// Open the archive at `path`.
    ///
    /// Fails with [`Error::UnreadableArchive`] if the file is not a
    /// supported container or its directory cannot be read.
    pub fn open(path: &Path) -> Result<Self> {
        let container = detect(path)?;
        let mut backend: Box<dyn Backend> = match container {
            Container::Zip => Box::new(ZipBackend::open(path)?),
            #[cfg(feature = "rar")]
            Container::Rar => Box::new(crate::rar_archive::RarBackend::open(path)?),
            #[cfg(not(feature = "rar"))]
            Container::Rar => {
                return Err(Error::unreadable(path, "rar support is not enabled"));
            }
        };

        let entries = backend.entries();

        let comic_info = entries
            .iter()
            .filter(|e| !is_hidden(&e.name) && base_name(&e.name).eq_ignore_ascii_case(COMIC_INFO))
            .min_by_key(|e| e.name.matches('/').count())
            .cloned();

        let mut page_entries: Vec<Entry> = entries
            .into_iter()
            .filter(|e| is_image(&e.name) && !is_hidden(&e.name))
            .collect();
        page_entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        let pages = page_entries
            .iter()
            .enumerate()
            .map(|(index, e)| PageRef {
                index,
                name: e.name.clone(),
                size: e.size,
            })
            .collect();

        tracing::debug!(
            path = %path.display(),
            ?container,
            has_comic_info = comic_info.is_some(),
            "Opened archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            container,
            backend,
            pages,
            page_entries,
            comic_info,
            metadata: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// Page entries in natural display order.
    pub fn pages(&self) -> &[PageRef] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The parsed `ComicInfo.xml`, if the archive has a readable one.
    ///
    /// A document that fails to parse is logged and treated as absent.
    pub fn embedded_metadata(&mut self) -> Option<EmbeddedMetadata> {
        if let Some(cached) = &self.metadata {
            return cached.clone();
        }
        let parsed = self.read_comic_info();
        self.metadata = Some(parsed.clone());
        parsed
    }

    fn read_comic_info(&mut self) -> Option<EmbeddedMetadata> {
        let entry = self.comic_info.as_ref()?;
        let bytes = match self.backend.read(entry) {
            Ok(bytes) => bytes,
            Err(reason) => {
                tracing::warn!(path = %self.path.display(), %reason, "Failed to read ComicInfo.xml");
                return None;
            }
        };
        match comicinfo::parse(&String::from_utf8_lossy(&bytes)) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring malformed ComicInfo.xml");
                None
            }
        }
    }

    /// Raw bytes of the page at `index`.
    pub fn extract_page(&mut self, index: usize) -> Result<Vec<u8>> {
        let page_count = self.page_entries.len();
        let entry = self
            .page_entries
            .get(index)
            .ok_or(Error::PageNotFound { index, page_count })?;
        self.backend
            .read(entry)
            .map_err(|reason| Error::unreadable(&self.path, format!("page {}: {reason}", entry.name)))
    }

    /// Index of the cover page: the ComicInfo front cover when it names a
    /// page in range, otherwise the first page. `None` for empty archives.
    pub fn cover_index(&mut self) -> Option<usize> {
        let count = self.page_count();
        if count == 0 {
            return None;
        }
        let declared = self
            .embedded_metadata()
            .and_then(|m| m.cover_page)
            .map(|c| c as usize)
            .filter(|&c| c < count);
        Some(declared.unwrap_or(0))
    }

    /// Render the cover as a thumbnail.
    pub fn thumbnail(&mut self, opts: &ThumbnailOptions) -> Result<Vec<u8>> {
        let index = self.cover_index().ok_or(Error::PageNotFound {
            index: 0,
            page_count: 0,
        })?;
        let cover = self.extract_page(index)?;
        Ok(thumbnail::render(cover, opts))
    }
}

impl std::fmt::Debug for ComicArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComicArchive")
            .field("path", &self.path)
            .field("container", &self.container)
            .field("pages", &self.pages.len())
            .finish()
    }
}
