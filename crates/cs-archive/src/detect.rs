//! Container detection by magic bytes, falling back to the file extension.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cs_core::{Error, Result};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// An empty zip is just the end-of-central-directory record.
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const RAR_MAGIC: &[u8] = b"Rar!\x1a\x07";

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Zip,
    Rar,
}

impl Container {
    fn from_magic(head: &[u8]) -> Option<Self> {
        if head.starts_with(ZIP_MAGIC) || head.starts_with(ZIP_EMPTY_MAGIC) {
            Some(Container::Zip)
        } else if head.starts_with(RAR_MAGIC) {
            Some(Container::Rar)
        } else {
            None
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cbz" | "zip" => Some(Container::Zip),
            "cbr" | "rar" => Some(Container::Rar),
            _ => None,
        }
    }
}

/// Work out which container `path` holds.
///
/// The first bytes decide when they carry a known signature, so a `.cbr`
/// that is really a zip still opens. Otherwise the extension decides and the
/// backend reports corruption if the guess is wrong.
pub fn detect(path: &Path) -> Result<Container> {
    let mut head = [0u8; 8];
    let read = File::open(path)
        .and_then(|mut f| read_prefix(&mut f, &mut head))
        .map_err(|e| Error::unreadable(path, e))?;

    Container::from_magic(&head[..read])
        .or_else(|| Container::from_extension(path))
        .ok_or_else(|| Error::unreadable(path, "not a supported comic container"))
}

/// Fill as much of `buf` as the reader allows; short files are fine.
fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
