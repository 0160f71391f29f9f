//! Shared test harness for integration tests.
//!
//! [`TestLibrary`] owns a temporary library root and data directory and a
//! fully wired [`Library`] on top of them. Archives are written as real CBZ
//! files with tiny PNG pages so thumbnails and page extraction work.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use cs_core::config::Config;
use cs_core::{ScanMode, ScanRun};
use cs_library::{Library, RescanOutcome};

pub struct TestLibrary {
    pub library: Library,
    root: TempDir,
    data: TempDir,
}

impl TestLibrary {
    /// One root, default settings.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// One root; `tweak` may adjust the config before the library opens.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create root dir");
        let data = tempfile::tempdir().expect("failed to create data dir");

        let mut config = Config::default();
        config.library.roots = vec![root.path().to_path_buf()];
        config.storage.data_dir = data.path().to_path_buf();
        tweak(&mut config);

        let library = Library::open(config).expect("failed to open library");
        Self {
            library,
            root,
            data,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn data_dir(&self) -> &Path {
        self.data.path()
    }

    /// Write a CBZ under the root with one PNG per page name.
    pub fn add_comic(&self, rel: &str, pages: &[&str]) -> PathBuf {
        let path = self.root().join(rel);
        write_cbz(&path, pages, None);
        path
    }

    /// Like [`TestLibrary::add_comic`] with a ComicInfo.xml entry.
    pub fn add_comic_with_info(&self, rel: &str, pages: &[&str], comic_info: &str) -> PathBuf {
        let path = self.root().join(rel);
        write_cbz(&path, pages, Some(comic_info));
        path
    }

    /// Run a full scan and return the finished run.
    pub async fn full_scan(&self) -> ScanRun {
        self.scan(ScanMode::Full).await
    }

    pub async fn scan(&self, mode: ScanMode) -> ScanRun {
        match self.library.scanner().rescan(mode).await.unwrap() {
            RescanOutcome::Finished(run) => run,
            RescanOutcome::AlreadyRunning => panic!("scan unexpectedly already running"),
        }
    }
}

/// A small solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Write a CBZ at `path`, creating parent directories.
pub fn write_cbz(path: &Path, pages: &[&str], comic_info: Option<&str>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let opts = SimpleFileOptions::default();
    let page = png(8, 12);
    for name in pages {
        zip.start_file(*name, opts).unwrap();
        zip.write_all(&page).unwrap();
    }
    if let Some(xml) = comic_info {
        zip.start_file("ComicInfo.xml", opts).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Minimal ComicInfo.xml document.
pub fn comic_info(series: &str, number: &str, title: &str, year: i32) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<ComicInfo>\n  <Series>{series}</Series>\n  \
         <Number>{number}</Number>\n  <Title>{title}</Title>\n  <Year>{year}</Year>\n</ComicInfo>\n"
    )
}
