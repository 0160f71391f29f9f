//! cs-archive: read-only access to comic archives.
//!
//! Opens zip/cbz (and rar/cbr with the `rar` feature), lists page images in
//! natural display order, reads the embedded `ComicInfo.xml`, extracts page
//! bytes and renders cover thumbnails.

mod archive;
pub mod comicinfo;
pub mod detect;
pub mod thumbnail;

mod zip_archive;

#[cfg(feature = "rar")]
mod rar_archive;

pub use archive::{is_image, ComicArchive, PageRef, IMAGE_EXTENSIONS};
pub use detect::Container;
pub use thumbnail::ThumbnailOptions;

use std::path::Path;

use cs_core::Result;

/// Open the archive at `path`. Shorthand for [`ComicArchive::open`].
pub fn open(path: &Path) -> Result<ComicArchive> {
    ComicArchive::open(path)
}
