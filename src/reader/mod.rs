//! Parsing of CFBF/OLE2 container bytes: listing the streams it contains
//! and reading any one of them back out.
//!
//! The reader works entirely over an in-memory byte slice; it never does
//! its own I/O, so callers decide how the bytes got there (a file read, a
//! network fetch, an embedded resource).

mod directory;
mod fat;
mod header;

pub mod file_entry;

pub use file_entry::FileEntry;

use crate::consts::{MAGIC, MINIMAL_CFBF_SIZE};
use crate::error::Result;

/// List every stream stored in a CFBF container, with its path, size,
/// CLSID, and timestamps.
pub fn files(bytes: &[u8]) -> Result<Vec<FileEntry>> {
    let head = header::parse(bytes)?;
    let fat_table = fat::load_fat(bytes, &head)?;
    let dir_data = fat::read_stream(bytes, &fat_table, head.first_dir_sector)?;
    directory::collect_file_entries(&dir_data, head.mini_stream_cutoff)
}

/// Read the full contents of a stream previously returned by [`files`].
pub fn file_data(bytes: &[u8], entry: &FileEntry) -> Result<Vec<u8>> {
    let head = header::parse(bytes)?;
    let fat_table = fat::load_fat(bytes, &head)?;

    match entry.mini_stream_sector {
        Some(mini_start) => {
            let minifat = fat::load_minifat(bytes, &fat_table, &head)?;
            let dir_data = fat::read_stream(bytes, &fat_table, head.first_dir_sector)?;
            let root = directory::parse_root(&dir_data)?;
            let ministream = fat::read_stream(bytes, &fat_table, root.start_sector)?;
            fat::read_mini_stream(&ministream, &minifat, mini_start, entry.size)
        },
        None => {
            let mut data = fat::read_stream(bytes, &fat_table, entry.start_sector)?;
            data.truncate(entry.size as usize);
            Ok(data)
        },
    }
}

/// Cheap magic-byte sniff: does `bytes` look like a CFBF container at all?
/// Does not validate the rest of the header.
pub fn is_cfb_file(bytes: &[u8]) -> bool {
    bytes.len() >= MINIMAL_CFBF_SIZE && &bytes[0..8] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_cfb_file_rejects_short_input() {
        assert!(!is_cfb_file(&[0u8; 4]));
    }

    #[test]
    fn is_cfb_file_rejects_wrong_magic() {
        assert!(!is_cfb_file(&[0u8; MINIMAL_CFBF_SIZE]));
    }

    #[test]
    fn is_cfb_file_accepts_correct_magic() {
        let mut bytes = vec![0u8; MINIMAL_CFBF_SIZE];
        bytes[0..8].copy_from_slice(MAGIC);
        assert!(is_cfb_file(&bytes));
    }
}
