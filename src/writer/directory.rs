//! Directory (storage/stream tree) generation.
//!
//! Builds the 128-byte directory entries and arranges each storage's
//! children into a balanced binary tree keyed on the container's canonical
//! sibling order: ascending by UTF-16LE byte length of the uppercased name,
//! then ascending by the UTF-16LE byte sequence itself.

use crate::consts::*;
use std::collections::HashMap;

/// In-memory builder for a single 128-byte directory entry.
#[derive(Debug, Clone)]
pub struct DirectoryEntryBuilder {
    pub name: String,
    pub entry_type: u8,
    pub start_sector: u32,
    pub size: u64,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub clsid: Option<[u8; 16]>,
}

impl DirectoryEntryBuilder {
    pub fn root(start_sector: u32, size: u64) -> Self {
        Self {
            name: "Root Entry".to_string(),
            entry_type: STGTY_ROOT,
            start_sector,
            size,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            clsid: None,
        }
    }

    pub fn stream(name: String, start_sector: u32, size: u64) -> Self {
        Self {
            name,
            entry_type: STGTY_STREAM,
            start_sector,
            size,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            clsid: None,
        }
    }

    pub fn storage(name: String) -> Self {
        Self {
            name,
            entry_type: STGTY_STORAGE,
            start_sector: 0,
            size: 0,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            clsid: None,
        }
    }

    pub fn set_clsid(&mut self, clsid: [u8; 16]) {
        self.clsid = Some(clsid);
    }

    /// Encode this entry to its on-disk 128-byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; DIRENTRY_SIZE];

        let utf16: Vec<u16> = self.name.encode_utf16().collect();
        let name_len = utf16.len().min(31);

        for (i, &ch) in utf16.iter().take(name_len).enumerate() {
            let bytes = ch.to_le_bytes();
            data[i * 2] = bytes[0];
            data[i * 2 + 1] = bytes[1];
        }

        let name_len_bytes = ((name_len + 1) * 2) as u16;
        data[64..66].copy_from_slice(&name_len_bytes.to_le_bytes());

        data[66] = self.entry_type;
        data[67] = 1; // node color: always black, see spec.md §9

        data[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        data[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        data[76..80].copy_from_slice(&self.sid_child.to_le_bytes());

        if let Some(clsid) = self.clsid {
            data[80..96].copy_from_slice(&clsid);
        }
        // state bits (96..100) and timestamps (100..116) stay zero

        data[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        data[120..128].copy_from_slice(&self.size.to_le_bytes());

        data
    }
}

/// Builds the directory stream from storages and streams added by path.
pub struct DirectoryBuilder {
    entries: Vec<DirectoryEntryBuilder>,
    path_to_sid: HashMap<Vec<String>, u32>,
    children: HashMap<u32, Vec<u32>>,
}

impl DirectoryBuilder {
    pub fn new(ministream_start: u32, ministream_size: u64) -> Self {
        let root = DirectoryEntryBuilder::root(ministream_start, ministream_size);
        let mut path_to_sid = HashMap::new();
        path_to_sid.insert(Vec::new(), 0);
        let mut children = HashMap::new();
        children.insert(0, Vec::new());
        Self {
            entries: vec![root],
            path_to_sid,
            children,
        }
    }

    pub fn set_root_clsid(&mut self, clsid: [u8; 16]) {
        self.entries[0].set_clsid(clsid);
    }

    /// Ensure every storage along `path` exists, creating missing ones.
    /// Returns the SID of the storage at `path`.
    pub fn add_storage_path(&mut self, path: &[String]) -> u32 {
        let mut current_path: Vec<String> = Vec::new();
        let mut parent_sid = 0u32;

        for component in path {
            current_path.push(component.clone());
            if let Some(&sid) = self.path_to_sid.get(&current_path) {
                parent_sid = sid;
                continue;
            }

            let sid = self.entries.len() as u32;
            self.entries.push(DirectoryEntryBuilder::storage(component.clone()));
            self.path_to_sid.insert(current_path.clone(), sid);
            self.children.entry(parent_sid).or_default().push(sid);
            self.children.entry(sid).or_default();

            parent_sid = sid;
        }

        parent_sid
    }

    /// Add a stream at `full_path`, creating any missing parent storages.
    pub fn add_stream_path(&mut self, full_path: &[String], start_sector: u32, size: u64) -> u32 {
        let parent_sid = if full_path.len() > 1 {
            self.add_storage_path(&full_path[..full_path.len() - 1])
        } else {
            0
        };

        let name = full_path.last().expect("stream path must not be empty").clone();
        let sid = self.entries.len() as u32;
        self.entries.push(DirectoryEntryBuilder::stream(name, start_sector, size));
        self.children.entry(parent_sid).or_default().push(sid);
        sid
    }

    /// Serialize all entries (after tree-shaping each storage's children)
    /// into the concatenated directory stream.
    pub fn generate_directory_stream(&mut self) -> Vec<u8> {
        let storage_sids: Vec<u32> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(sid, e)| {
                if e.entry_type == STGTY_ROOT || e.entry_type == STGTY_STORAGE {
                    Some(sid as u32)
                } else {
                    None
                }
            })
            .collect();

        for parent_sid in storage_sids {
            match self.children.get(&parent_sid).cloned() {
                Some(children) => Self::link_children(parent_sid, &children, &mut self.entries),
                None => self.entries[parent_sid as usize].sid_child = NOSTREAM,
            }
        }

        let mut data = Vec::with_capacity(self.entries.len() * DIRENTRY_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(&entry.to_bytes());
        }
        data
    }

    /// Canonical CFBF sibling key: ascending UTF-16LE byte length of the
    /// uppercased name, then ascending UTF-16LE byte sequence.
    fn sort_key(name: &str) -> (usize, Vec<u8>) {
        let upper = name.to_uppercase();
        let mut bytes = Vec::with_capacity(upper.len() * 2);
        for unit in upper.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        (bytes.len(), bytes)
    }

    /// Shape a parent's children into a balanced tree, rooted at the
    /// midpoint of the canonically sorted sibling list.
    fn link_children(parent_sid: u32, child_sids: &[u32], entries: &mut [DirectoryEntryBuilder]) {
        if child_sids.is_empty() {
            entries[parent_sid as usize].sid_child = NOSTREAM;
            return;
        }

        let mut sorted: Vec<u32> = child_sids.to_vec();
        sorted.sort_by_key(|&sid| Self::sort_key(&entries[sid as usize].name));

        let midpoint = sorted.len() / 2;
        entries[parent_sid as usize].sid_child = sorted[midpoint];

        entries[sorted[0] as usize].sid_left = NOSTREAM;
        entries[sorted[0] as usize].sid_right = NOSTREAM;

        for j in 1..midpoint {
            let sid = sorted[j] as usize;
            entries[sid].sid_left = sorted[j - 1];
            entries[sid].sid_right = NOSTREAM;
        }

        if midpoint > 0 {
            entries[sorted[midpoint] as usize].sid_left = sorted[midpoint - 1];
        } else {
            entries[sorted[midpoint] as usize].sid_left = NOSTREAM;
        }

        if midpoint < sorted.len() - 1 {
            entries[sorted[midpoint] as usize].sid_right = sorted[midpoint + 1];
            for j in (midpoint + 1)..(sorted.len() - 1) {
                let sid = sorted[j] as usize;
                entries[sid].sid_left = NOSTREAM;
                entries[sid].sid_right = sorted[j + 1];
            }
            let last = *sorted.last().unwrap() as usize;
            entries[last].sid_left = NOSTREAM;
            entries[last].sid_right = NOSTREAM;
        } else {
            entries[sorted[midpoint] as usize].sid_right = NOSTREAM;
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_entry_encodes_to_128_bytes() {
        let root = DirectoryEntryBuilder::root(0, 0);
        assert_eq!(root.name, "Root Entry");
        assert_eq!(root.entry_type, STGTY_ROOT);
        assert_eq!(root.to_bytes().len(), 128);
    }

    #[test]
    fn stream_entry_carries_sector_and_size() {
        let stream = DirectoryEntryBuilder::stream("Test".to_string(), 10, 512);
        assert_eq!(stream.entry_type, STGTY_STREAM);
        assert_eq!(stream.start_sector, 10);
        assert_eq!(stream.size, 512);
    }

    #[test]
    fn canonical_sort_orders_by_utf16_byte_length_first() {
        let mut dir = DirectoryBuilder::new(0, 0);
        dir.add_stream_path(&["WordDocument".to_string()], 0, 100);
        dir.add_stream_path(&["1Table".to_string()], 1, 100);

        let data = dir.generate_directory_stream();
        assert_eq!(data.len(), 3 * DIRENTRY_SIZE); // root + 2 streams

        // "1Table" (6 chars) sorts before "WordDocument" (12 chars), so it
        // becomes the left child of the midpoint ("WordDocument").
        let root_child = u32::from_le_bytes(data[76..80].try_into().unwrap());
        let word_doc_sid = dir
            .entries
            .iter()
            .position(|e| e.name == "WordDocument")
            .unwrap() as u32;
        assert_eq!(root_child, word_doc_sid);
    }

    #[test]
    fn single_stream_becomes_root_child() {
        let mut dir = DirectoryBuilder::new(0, 0);
        let sid = dir.add_stream_path(&["Stream1".to_string()], 5, 1024);
        assert_eq!(sid, 1);
        assert_eq!(dir.entry_count(), 2);

        let data = dir.generate_directory_stream();
        assert_eq!(data.len(), 2 * DIRENTRY_SIZE);
    }
}
