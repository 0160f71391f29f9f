//! Zip / CBZ backend.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use cs_core::{Error, Result};

use crate::archive::{Backend, Entry};

/// Cap on the up-front buffer reservation; the header size is untrusted.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

pub(crate) struct ZipBackend {
    archive: ZipArchive<BufReader<File>>,
}

impl ZipBackend {
    /// Open and validate the central directory.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::unreadable(path, e))?;
        Ok(Self { archive })
    }
}

impl Backend for ZipBackend {
    fn entries(&mut self) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.archive.len());
        for slot in 0..self.archive.len() {
            match self.archive.by_index_raw(slot) {
                Ok(file) => {
                    if file.is_dir() {
                        continue;
                    }
                    out.push(Entry {
                        name: file.name().to_string(),
                        size: file.size(),
                        slot,
                    });
                }
                Err(e) => {
                    tracing::warn!(slot, error = %e, "Skipping unreadable zip entry");
                }
            }
        }
        out
    }

    fn read(&mut self, entry: &Entry) -> std::result::Result<Vec<u8>, String> {
        let mut file = self.archive.by_index(entry.slot).map_err(|e| e.to_string())?;
        let mut buf = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut buf).map_err(|e| e.to_string())?;
        Ok(buf)
    }
}
