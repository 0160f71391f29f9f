//! RAR / CBR backend, built with the `rar` feature.
//!
//! unrar streams entries in order, so reading one page walks the headers up
//! to its slot. Comic archives are small enough that this stays cheap.

use std::path::{Path, PathBuf};

use unrar::Archive;

use cs_core::{Error, Result};

use crate::archive::{Backend, Entry};

pub(crate) struct RarBackend {
    path: PathBuf,
}

impl RarBackend {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        Archive::new(path)
            .open_for_listing()
            .map_err(|e| Error::unreadable(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Backend for RarBackend {
    fn entries(&mut self) -> Vec<Entry> {
        let listing = match Archive::new(&self.path).open_for_listing() {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to list rar archive");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for (slot, header) in listing.enumerate() {
            match header {
                Ok(header) => {
                    if header.is_directory() {
                        continue;
                    }
                    out.push(Entry {
                        name: header.filename.to_string_lossy().replace('\\', "/"),
                        size: header.unpacked_size,
                        slot,
                    });
                }
                Err(e) => {
                    // Headers after a broken one cannot be located reliably.
                    tracing::warn!(slot, error = %e, "Stopping rar listing at unreadable header");
                    break;
                }
            }
        }
        out
    }

    fn read(&mut self, entry: &Entry) -> std::result::Result<Vec<u8>, String> {
        let mut archive = Archive::new(&self.path)
            .open_for_processing()
            .map_err(|e| e.to_string())?;
        let mut slot = 0;
        while let Some(header) = archive.read_header().map_err(|e| e.to_string())? {
            if slot == entry.slot {
                let (data, _) = header.read().map_err(|e| e.to_string())?;
                return Ok(data);
            }
            archive = header.skip().map_err(|e| e.to_string())?;
            slot += 1;
        }
        Err(format!("entry {} not found", entry.name))
    }
}
