//! Read-side API for the web layer.
//!
//! Every call reads committed state through a pooled connection and never
//! waits for a running scan. Page and thumbnail calls open the archive on
//! demand; they are blocking and belong on a blocking thread in async code.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use cs_archive::{PageRef, ThumbnailOptions};
use cs_core::{Error, IssueId, Result, SeriesId};
use cs_db::models::{Issue, Series};
use cs_db::LibraryStore;

/// One extracted page ready to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageData {
    pub index: usize,
    pub name: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct LibraryService {
    store: Arc<LibraryStore>,
    thumbnails: ThumbnailOptions,
}

impl LibraryService {
    pub fn new(store: Arc<LibraryStore>, thumbnails: ThumbnailOptions) -> Self {
        Self { store, thumbnails }
    }

    pub fn list_series(&self) -> Result<Vec<Series>> {
        self.store.list_series()
    }

    pub fn get_series(&self, id: SeriesId) -> Result<Series> {
        self.store.get_series(id)
    }

    pub fn list_issues(&self, series_id: SeriesId) -> Result<Vec<Issue>> {
        self.store.list_issues(series_id)
    }

    pub fn get_issue(&self, id: IssueId) -> Result<Issue> {
        self.store.get_issue(id)
    }

    /// Page list of an issue, read from its archive.
    pub fn pages(&self, issue_id: IssueId) -> Result<Vec<PageRef>> {
        let issue = self.live_issue(issue_id)?;
        let archive = cs_archive::open(Path::new(&issue.file_path))?;
        Ok(archive.pages().to_vec())
    }

    /// Raw bytes of one page.
    pub fn get_page(&self, issue_id: IssueId, index: usize) -> Result<PageData> {
        let issue = self.live_issue(issue_id)?;
        let mut archive = cs_archive::open(Path::new(&issue.file_path))?;
        let bytes = archive.extract_page(index)?;
        let name = archive
            .pages()
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Ok(PageData {
            index,
            content_type: content_type(&name),
            name,
            bytes,
        })
    }

    /// JPEG thumbnail of the issue's cover.
    pub fn get_thumbnail(&self, issue_id: IssueId) -> Result<Vec<u8>> {
        let issue = self.live_issue(issue_id)?;
        let mut archive = cs_archive::open(Path::new(&issue.file_path))?;
        archive.thumbnail(&self.thumbnails)
    }

    /// Record reading progress; the page must exist in the issue.
    pub fn set_progress(&self, issue_id: IssueId, page: u32, is_read: bool) -> Result<()> {
        let issue = self.live_issue(issue_id)?;
        if issue.page_count > 0 && page >= issue.page_count {
            return Err(Error::PageNotFound {
                index: page as usize,
                page_count: issue.page_count as usize,
            });
        }
        self.store.set_progress(issue_id, page, is_read)
    }

    fn live_issue(&self, id: IssueId) -> Result<Issue> {
        let issue = self.store.get_issue(id)?;
        if issue.retired {
            return Err(Error::not_found("issue", id));
        }
        Ok(issue)
    }
}

impl std::fmt::Debug for LibraryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryService")
            .field("thumbnails", &self.thumbnails)
            .finish_non_exhaustive()
    }
}

/// MIME type for a page image, by extension.
pub fn content_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "jxl" => "image/jxl",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        assert_eq!(content_type("001.JPG"), "image/jpeg");
        assert_eq!(content_type("dir/p.webp"), "image/webp");
        assert_eq!(content_type("ComicInfo.xml"), "application/octet-stream");
    }

    #[test]
    fn unknown_issue_is_not_found() {
        let store = Arc::new(LibraryStore::open_in_memory().unwrap());
        let service = LibraryService::new(store, ThumbnailOptions::default());
        assert!(service.pages(IssueId::new()).unwrap_err().is_not_found());
        assert!(service.get_thumbnail(IssueId::new()).unwrap_err().is_not_found());
    }
}
