//! Directory entry decoding and red-black tree traversal.

use crate::consts::*;
use crate::error::{CfbError, Result};
use crate::reader::file_entry::{self, FileEntry};
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    name: [u8; 64],
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

pub(crate) struct ParsedEntry {
    pub name: String,
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub clsid: [u8; 16],
    pub creation_time: u64,
    pub modified_time: u64,
    pub start_sector: u32,
    pub size: u64,
}

fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(CfbError::InvalidUtf16Name);
    }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|_| CfbError::InvalidUtf16Name)
}

fn parse_entry(data: &[u8]) -> Result<ParsedEntry> {
    let raw = RawDirectoryEntry::read_from_bytes(data)
        .map_err(|_| CfbError::MalformedHeader("failed to parse directory entry".to_string()))?;

    let name_len = raw.name_len.get() as usize;
    let name_byte_len = name_len.saturating_sub(2).min(64);
    let name = decode_utf16le(&raw.name[0..name_byte_len])?;

    Ok(ParsedEntry {
        name,
        entry_type: raw.entry_type,
        sid_left: raw.sid_left.get(),
        sid_right: raw.sid_right.get(),
        sid_child: raw.sid_child.get(),
        clsid: raw.clsid,
        creation_time: raw.creation_time.get(),
        modified_time: raw.modified_time.get(),
        start_sector: raw.start_sector.get(),
        size: raw.stream_size.get(),
    })
}

/// Parse just the Root Entry (index 0 of the directory stream).
pub(crate) fn parse_root(dir_data: &[u8]) -> Result<ParsedEntry> {
    if dir_data.len() < DIRENTRY_SIZE {
        return Err(CfbError::MalformedHeader("directory stream too small".to_string()));
    }
    parse_entry(&dir_data[0..DIRENTRY_SIZE])
}

/// Nearest-ancestor FILETIME pair, inherited by a stream whose own
/// timestamps are zero.
type AncestorTimes = (u64, u64);

fn build_file_entry(
    path: &[String],
    entry: &ParsedEntry,
    mini_stream_cutoff: u32,
    ancestor: AncestorTimes,
) -> FileEntry {
    let is_mini = entry.size < mini_stream_cutoff as u64;
    let creation_time = if entry.creation_time != 0 { entry.creation_time } else { ancestor.0 };
    let modified_time = if entry.modified_time != 0 { entry.modified_time } else { ancestor.1 };
    FileEntry {
        path: path.to_vec(),
        start_sector: if is_mini { 0 } else { entry.start_sector },
        size: entry.size,
        clsid: file_entry::format_clsid(&entry.clsid),
        created: file_entry::filetime_to_datetime(creation_time),
        modified: file_entry::filetime_to_datetime(modified_time),
        mini_stream_sector: if is_mini { Some(entry.start_sector) } else { None },
    }
}

/// Nearest ancestor timestamps seen so far, updated with `entry`'s own
/// (non-zero) fields if it is a storage.
fn inherit(ancestor: AncestorTimes, entry: &ParsedEntry) -> AncestorTimes {
    let creation = if entry.creation_time != 0 { entry.creation_time } else { ancestor.0 };
    let modified = if entry.modified_time != 0 { entry.modified_time } else { ancestor.1 };
    (creation, modified)
}

/// One step of an iterative in-order walk: either descend into a subtree
/// rooted at a SID, or process a SID already fully left-descended.
enum Frame {
    Descend(u32, Vec<String>, AncestorTimes),
    Process(u32, Vec<String>, AncestorTimes),
}

/// Walk the directory tree starting at the Root Entry's child, collecting
/// every stream in ascending sibling order (left subtree, self, right
/// subtree), matching the canonical CFBF sibling order used by the writer.
/// Storages are descended into but not themselves returned.
///
/// Uses a visited bitset so a corrupt, cyclic tree errors out instead of
/// looping forever.
pub(crate) fn collect_file_entries(dir_data: &[u8], mini_stream_cutoff: u32) -> Result<Vec<FileEntry>> {
    let num_entries = dir_data.len() / DIRENTRY_SIZE;
    if num_entries == 0 {
        return Ok(Vec::new());
    }

    let root = parse_entry(&dir_data[0..DIRENTRY_SIZE])?;
    let root_ancestor = (root.creation_time, root.modified_time);

    let mut out = Vec::new();
    let mut scheduled = FixedBitSet::with_capacity(num_entries);
    let mut stack: SmallVec<[Frame; 32]> = SmallVec::new();
    if root.sid_child != NOSTREAM {
        stack.push(Frame::Descend(root.sid_child, Vec::new(), root_ancestor));
    }

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Descend(sid, parent_path, ancestor) => {
                if sid == NOSTREAM {
                    continue;
                }
                let idx = sid as usize;
                if idx >= num_entries {
                    return Err(CfbError::OutOfRangeSector { sector: sid, limit: num_entries as u32 });
                }
                if scheduled.contains(idx) {
                    return Err(CfbError::CyclicChain { start: sid });
                }
                scheduled.insert(idx);

                let entry = parse_entry(&dir_data[idx * DIRENTRY_SIZE..(idx + 1) * DIRENTRY_SIZE])?;

                // Stack is LIFO: push right last-processed first (bottom),
                // then self, then left (top, so it pops and descends first).
                stack.push(Frame::Descend(entry.sid_right, parent_path.clone(), ancestor));
                stack.push(Frame::Process(sid, parent_path.clone(), ancestor));
                stack.push(Frame::Descend(entry.sid_left, parent_path, ancestor));
            },
            Frame::Process(sid, parent_path, ancestor) => {
                let idx = sid as usize;
                let entry = parse_entry(&dir_data[idx * DIRENTRY_SIZE..(idx + 1) * DIRENTRY_SIZE])?;

                let mut full_path = parent_path;
                full_path.push(entry.name.clone());

                match entry.entry_type {
                    STGTY_STREAM => out.push(build_file_entry(&full_path, &entry, mini_stream_cutoff, ancestor)),
                    STGTY_STORAGE => {
                        if entry.sid_child != NOSTREAM {
                            let child_ancestor = inherit(ancestor, &entry);
                            stack.push(Frame::Descend(entry.sid_child, full_path, child_ancestor));
                        }
                    },
                    _ => {},
                }
            },
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(name: &str, entry_type: u8, left: u32, right: u32, child: u32, size: u64) -> Vec<u8> {
        let mut buf = vec![0u8; DIRENTRY_SIZE];
        let utf16: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        buf[0..utf16.len()].copy_from_slice(&utf16);
        let name_len = (utf16.len() + 2) as u16;
        buf[64..66].copy_from_slice(&name_len.to_le_bytes());
        buf[66] = entry_type;
        buf[68..72].copy_from_slice(&left.to_le_bytes());
        buf[72..76].copy_from_slice(&right.to_le_bytes());
        buf[76..80].copy_from_slice(&child.to_le_bytes());
        buf[120..128].copy_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn collects_single_stream_under_root() {
        let mut dir = raw_entry("Root Entry", STGTY_ROOT, NOSTREAM, NOSTREAM, 1, 0);
        dir.extend(raw_entry("Stream", STGTY_STREAM, NOSTREAM, NOSTREAM, NOSTREAM, 10));

        let entries = collect_file_entries(&dir, MINI_STREAM_CUTOFF).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, vec!["Stream".to_string()]);
        assert_eq!(entries[0].size, 10);
        assert!(entries[0].mini_stream_sector.is_some());
    }

    #[test]
    fn descends_into_storages_and_builds_full_path() {
        let mut dir = raw_entry("Root Entry", STGTY_ROOT, NOSTREAM, NOSTREAM, 1, 0);
        dir.extend(raw_entry("Storage", STGTY_STORAGE, NOSTREAM, NOSTREAM, 2, 0));
        dir.extend(raw_entry("Stream", STGTY_STREAM, NOSTREAM, NOSTREAM, NOSTREAM, 5000));

        let entries = collect_file_entries(&dir, MINI_STREAM_CUTOFF).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, vec!["Storage".to_string(), "Stream".to_string()]);
        assert!(entries[0].mini_stream_sector.is_none());
    }

    #[test]
    fn detects_cyclic_directory() {
        let mut dir = raw_entry("Root Entry", STGTY_ROOT, NOSTREAM, NOSTREAM, 1, 0);
        dir.extend(raw_entry("A", STGTY_STORAGE, NOSTREAM, NOSTREAM, 2, 0));
        dir.extend(raw_entry("B", STGTY_STORAGE, NOSTREAM, NOSTREAM, 1, 0));

        assert!(matches!(collect_file_entries(&dir, MINI_STREAM_CUTOFF), Err(CfbError::CyclicChain { .. })));
    }

    #[test]
    fn visits_siblings_in_ascending_in_order_sequence() {
        // Root child is "example3.txt" (sid 1), whose left is "example2.txt"
        // (sid 2, itself left = "example.txt", sid 3) and right is
        // "example4.txt" (sid 4) — the writer's balanced-tree shape for four
        // same-length-bucket names. In-order traversal must still yield
        // ascending order regardless of where the tree root sits.
        let mut dir = raw_entry("Root Entry", STGTY_ROOT, NOSTREAM, NOSTREAM, 1, 0);
        dir.extend(raw_entry("example3.txt", STGTY_STREAM, 2, 4, NOSTREAM, 3));
        dir.extend(raw_entry("example2.txt", STGTY_STREAM, 3, NOSTREAM, NOSTREAM, 3));
        dir.extend(raw_entry("example.txt", STGTY_STREAM, NOSTREAM, NOSTREAM, NOSTREAM, 3));
        dir.extend(raw_entry("example4.txt", STGTY_STREAM, NOSTREAM, NOSTREAM, NOSTREAM, 3));

        let entries = collect_file_entries(&dir, MINI_STREAM_CUTOFF).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.path[0].as_str()).collect();
        assert_eq!(names, vec!["example.txt", "example2.txt", "example3.txt", "example4.txt"]);
    }

    #[test]
    fn stream_with_zero_timestamps_inherits_from_nearest_ancestor_storage() {
        let mut dir = raw_entry("Root Entry", STGTY_ROOT, NOSTREAM, NOSTREAM, 1, 0);
        let mut storage = raw_entry("Storage", STGTY_STORAGE, NOSTREAM, NOSTREAM, 2, 0);
        storage[100..108].copy_from_slice(&123_456_789_000_000_000u64.to_le_bytes());
        storage[108..116].copy_from_slice(&123_456_789_000_000_000u64.to_le_bytes());
        dir.extend(storage);
        dir.extend(raw_entry("Stream", STGTY_STREAM, NOSTREAM, NOSTREAM, NOSTREAM, 10));

        let entries = collect_file_entries(&dir, MINI_STREAM_CUTOFF).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].created.is_some());
        assert!(entries[0].modified.is_some());
    }
}
