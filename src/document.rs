//! The in-memory writer data model: a pending set of streams and storages
//! that [`Document::render`] turns into CFBF container bytes.

use crate::consts::*;
use crate::error::{CfbError, Result};
use crate::writer::fat::SectorAllocator;
use crate::writer::finalize;
use crate::writer::minifat::MiniStreamEngine;
use std::collections::{HashMap, HashSet};

/// A pending stream, sector-allocated at insertion time.
pub(crate) struct Object {
    pub path: Vec<String>,
    pub start_sector: u32,
    pub size: u64,
    pub is_mini: bool,
    /// Raw bytes for non-mini streams; empty for mini streams, whose data
    /// already lives in the mini-stream engine's buffer.
    pub data: Vec<u8>,
}

/// An in-memory CFBF document under construction.
///
/// Streams and storages are added one at a time; each stream's sector (or
/// mini-sector) is assigned as soon as it is added, not deferred to
/// [`Document::render`]. Rendering only finishes the parts that cannot be
/// known until every stream has been seen: the mini-stream, the directory,
/// and the FAT/DIFAT regions.
pub struct Document {
    pub(crate) fat: SectorAllocator,
    pub(crate) mini: MiniStreamEngine,
    pub(crate) streams: Vec<Object>,
    pub(crate) explicit_storages: Vec<Vec<String>>,
    pub(crate) root_clsid: [u8; 16],
    storage_paths: HashSet<Vec<String>>,
    sibling_names: HashMap<Vec<String>, HashSet<String>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Start a new, empty document (512-byte sectors, no root CLSID).
    pub fn new() -> Self {
        Self {
            fat: SectorAllocator::new(),
            mini: MiniStreamEngine::new(),
            streams: Vec::new(),
            explicit_storages: Vec::new(),
            root_clsid: [0u8; 16],
            storage_paths: HashSet::new(),
            sibling_names: HashMap::new(),
        }
    }

    /// Set the Root Entry's CLSID, e.g. so Office recognizes the document
    /// type. Non-root entries never carry a writable CLSID.
    pub fn set_root_clsid(&mut self, clsid: [u8; 16]) {
        self.root_clsid = clsid;
    }

    /// Add a stream at `path`, creating any missing parent storages.
    ///
    /// The stream's sector (regular or mini, depending on `data.len()`
    /// against [`MINI_STREAM_CUTOFF`]) is allocated immediately.
    pub fn add_stream(&mut self, path: &[&str], data: &[u8]) -> Result<()> {
        let owned = Self::validate_path(path)?;

        if data.len() as u64 > MAX_STREAM_SIZE {
            return Err(CfbError::FileSizeLimitExceeded {
                id: self.streams.len() as u32,
                size: data.len() as u64,
            });
        }

        self.ensure_storage_ancestors(&owned)?;
        self.claim_name(&owned)?;

        let object = if (data.len() as u32) < MINI_STREAM_CUTOFF {
            let start_sector = self.mini.allocate_mini(data);
            Object {
                path: owned,
                start_sector,
                size: data.len() as u64,
                is_mini: true,
                data: Vec::new(),
            }
        } else {
            let start_sector = self.fat.allocate_chain(data.len());
            Object {
                path: owned,
                start_sector,
                size: data.len() as u64,
                is_mini: false,
                data: data.to_vec(),
            }
        };

        self.streams.push(object);
        Ok(())
    }

    /// Add a stream at a single `/`-separated path, creating any missing
    /// parent storages. Equivalent to [`Document::add_stream`] with the
    /// path already split on `/`; a trailing separator is rejected.
    pub fn add_file(&mut self, slash_path: &str, data: &[u8]) -> Result<()> {
        if slash_path.is_empty() || slash_path.ends_with('/') {
            return Err(CfbError::InvalidPath { path: slash_path.to_string() });
        }
        let parts: Vec<&str> = slash_path.split('/').collect();
        self.add_stream(&parts, data)
    }

    /// Declare a storage at `path`. Parent storages are created
    /// automatically. Idempotent if `path` was already created implicitly
    /// by an earlier [`Document::add_stream`] call.
    pub fn add_storage(&mut self, path: &[&str]) -> Result<()> {
        let owned = Self::validate_path(path)?;
        self.ensure_storage_ancestors(&owned)?;

        if self.storage_paths.contains(&owned) {
            return Ok(());
        }

        self.claim_name(&owned)?;
        self.storage_paths.insert(owned.clone());
        self.explicit_storages.push(owned);
        Ok(())
    }

    /// Replace an existing stream's contents, or add it if absent.
    ///
    /// The stream is reallocated at its (possibly new) insertion-time
    /// sector; any sectors used by the previous contents stay in the FAT,
    /// unreferenced by any chain, since this document is rendered once and
    /// never read back in to reclaim them.
    pub fn update_stream(&mut self, path: &[&str], data: &[u8]) -> Result<()> {
        let owned = Self::validate_path(path)?;
        if let Some(idx) = self.streams.iter().position(|o| o.path == owned) {
            self.streams.remove(idx);
            self.unclaim_name(&owned);
        }
        self.add_stream(path, data)
    }

    /// Remove a stream.
    pub fn delete_stream(&mut self, path: &[&str]) -> Result<()> {
        let owned = Self::validate_path(path)?;
        match self.streams.iter().position(|o| o.path == owned) {
            Some(idx) => {
                self.streams.remove(idx);
                self.unclaim_name(&owned);
                Ok(())
            },
            None => Err(CfbError::EntryNotFound),
        }
    }

    /// Remove a storage. Only empty storages (no stream or storage
    /// children) can be removed.
    pub fn delete_storage(&mut self, path: &[&str]) -> Result<()> {
        let owned = Self::validate_path(path)?;
        if !self.storage_paths.contains(&owned) {
            return Err(CfbError::EntryNotFound);
        }

        let has_children = self
            .streams
            .iter()
            .any(|o| o.path.len() == owned.len() + 1 && o.path.starts_with(owned.as_slice()))
            || self
                .storage_paths
                .iter()
                .any(|p| p.len() == owned.len() + 1 && p.starts_with(owned.as_slice()));

        if has_children {
            return Err(CfbError::InvalidPath { path: owned.join("/") });
        }

        self.storage_paths.remove(&owned);
        self.explicit_storages.retain(|p| p != &owned);
        self.unclaim_name(&owned);
        Ok(())
    }

    /// Render the document into complete CFBF container bytes.
    pub fn render(&self) -> Result<Vec<u8>> {
        if self.streams.is_empty() {
            return Err(CfbError::Empty);
        }
        finalize::render(self)
    }

    fn validate_path(path: &[&str]) -> Result<Vec<String>> {
        if path.is_empty() {
            return Err(CfbError::InvalidPath { path: String::new() });
        }

        let mut owned = Vec::with_capacity(path.len());
        for &component in path {
            if component.is_empty() || component.contains('/') || component.contains(':') {
                return Err(CfbError::InvalidPath { path: path.join("/") });
            }
            if component.encode_utf16().count() > 31 {
                return Err(CfbError::FilenameTooLong { name: component.to_string() });
            }
            owned.push(component.to_string());
        }
        Ok(owned)
    }

    fn ensure_storage_ancestors(&mut self, path: &[String]) -> Result<()> {
        for i in 1..path.len() {
            let prefix = path[..i].to_vec();
            if self.storage_paths.insert(prefix.clone()) {
                self.claim_name(&prefix)?;
            }
        }
        Ok(())
    }

    fn claim_name(&mut self, path: &[String]) -> Result<()> {
        let parent = path[..path.len() - 1].to_vec();
        let leaf = path[path.len() - 1].to_uppercase();
        let siblings = self.sibling_names.entry(parent).or_default();
        if !siblings.insert(leaf) {
            return Err(CfbError::InvalidPath { path: path.join("/") });
        }
        Ok(())
    }

    fn unclaim_name(&mut self, path: &[String]) {
        let parent = path[..path.len() - 1].to_vec();
        let leaf = path[path.len() - 1].to_uppercase();
        if let Some(siblings) = self.sibling_names.get_mut(&parent) {
            siblings.remove(&leaf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_fails_to_render() {
        let doc = Document::new();
        assert!(matches!(doc.render(), Err(CfbError::Empty)));
    }

    #[test]
    fn rejects_empty_path() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.add_stream(&[], b"data"),
            Err(CfbError::InvalidPath { .. })
        ));
    }

    #[test]
    fn rejects_reserved_path_characters() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.add_stream(&["a/b"], b"data"),
            Err(CfbError::InvalidPath { .. })
        ));
        assert!(matches!(
            doc.add_stream(&["a:b"], b"data"),
            Err(CfbError::InvalidPath { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_sibling_names() {
        let mut doc = Document::new();
        doc.add_stream(&["Stream"], b"one").unwrap();
        assert!(matches!(
            doc.add_stream(&["Stream"], b"two"),
            Err(CfbError::InvalidPath { .. })
        ));
    }

    #[test]
    fn update_stream_reuses_the_freed_name() {
        let mut doc = Document::new();
        doc.add_stream(&["Stream"], b"one").unwrap();
        doc.update_stream(&["Stream"], b"two-longer-value").unwrap();
        assert_eq!(doc.streams.len(), 1);
    }

    #[test]
    fn delete_storage_refuses_nonempty() {
        let mut doc = Document::new();
        doc.add_stream(&["Storage", "Stream"], b"data").unwrap();
        assert!(matches!(
            doc.delete_storage(&["Storage"]),
            Err(CfbError::InvalidPath { .. })
        ));
    }

    #[test]
    fn stream_assigned_sector_at_insertion_time() {
        let mut doc = Document::new();
        doc.add_stream(&["Big"], &[0u8; 8192]).unwrap();
        assert_eq!(doc.streams[0].start_sector, 0);
        assert!(!doc.streams[0].is_mini);
    }

    #[test]
    fn add_file_splits_slash_path_and_creates_storages() {
        let mut doc = Document::new();
        doc.add_file("DirectoryA/example2.txt", b"data").unwrap();
        assert_eq!(doc.streams[0].path, vec!["DirectoryA".to_string(), "example2.txt".to_string()]);
        assert!(doc.storage_paths.contains(&vec!["DirectoryA".to_string()]));
    }

    #[test]
    fn add_file_rejects_trailing_separator() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.add_file("DirectoryA/", b"data"),
            Err(CfbError::InvalidPath { .. })
        ));
    }
}
