//! Mini-FAT generation for small streams.
//!
//! Streams smaller than [`crate::consts::MINI_STREAM_CUTOFF`] are packed
//! into the mini-stream instead of occupying whole regular sectors. The
//! mini-stream itself is written back as one ordinary stream allocated
//! through the regular FAT.

use crate::consts::*;

/// Allocates mini-sectors and builds the mini-stream for small streams.
#[derive(Debug, Clone)]
pub struct MiniStreamEngine {
    minifat: Vec<u32>,
    next_mini_sector: u32,
    ministream_data: Vec<u8>,
}

impl Default for MiniStreamEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniStreamEngine {
    pub fn new() -> Self {
        Self {
            minifat: Vec::new(),
            next_mini_sector: 0,
            ministream_data: Vec::new(),
        }
    }

    /// Allocate a chain of mini-sectors for `data` and append it (padded to
    /// a mini-sector boundary) to the mini-stream. Returns the starting
    /// mini-sector, or `ENDOFCHAIN` for empty data.
    pub fn allocate_mini(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }

        let num_mini_sectors = data.len().div_ceil(MINI_SECTOR_SIZE);
        let start_mini_sector = self.next_mini_sector;

        let new_len =
            (self.next_mini_sector as usize + num_mini_sectors).max(self.minifat.len());
        if new_len > self.minifat.len() {
            self.minifat.resize(new_len, FREESECT);
        }

        for i in 0..num_mini_sectors {
            let current = self.next_mini_sector;
            self.next_mini_sector += 1;
            let next_value = if i < num_mini_sectors - 1 {
                current + 1
            } else {
                ENDOFCHAIN
            };
            self.minifat[current as usize] = next_value;
        }

        let padded_size = num_mini_sectors * MINI_SECTOR_SIZE;
        let offset = self.ministream_data.len();
        self.ministream_data.resize(offset + padded_size, 0);
        self.ministream_data[offset..offset + data.len()].copy_from_slice(data);

        start_mini_sector
    }

    /// The concatenated, mini-sector-padded mini-stream contents.
    pub fn ministream_data(&self) -> &[u8] {
        &self.ministream_data
    }

    /// Size of the mini-stream in bytes.
    pub fn ministream_size(&self) -> u64 {
        self.ministream_data.len() as u64
    }

    /// Whether any mini-sectors have been allocated.
    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }

    /// The mini-FAT table.
    pub fn minifat(&self) -> &[u32] {
        &self.minifat
    }

    /// Serialize the mini-FAT into 512-byte sectors, padded with
    /// `FREESECT`.
    pub fn generate_minifat_sectors(&self) -> Vec<Vec<u8>> {
        if self.minifat.is_empty() {
            return Vec::new();
        }

        let entries_per_sector = SECTOR_SIZE / 4;
        let num_sectors = self.minifat.len().div_ceil(entries_per_sector);

        let mut sectors = Vec::with_capacity(num_sectors);
        for sector_idx in 0..num_sectors {
            let mut sector_data = vec![0xFFu8; SECTOR_SIZE];
            let start_entry = sector_idx * entries_per_sector;
            let end_entry = (start_entry + entries_per_sector).min(self.minifat.len());

            for (i, &value) in self.minifat[start_entry..end_entry].iter().enumerate() {
                let offset = i * 4;
                sector_data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }

            sectors.push(sector_data);
        }

        sectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_mini_chain_pads_to_sector_boundary() {
        let mut mini = MiniStreamEngine::new();
        let data = vec![0xAAu8; 100];
        let start = mini.allocate_mini(&data);

        assert_eq!(start, 0);
        assert_eq!(mini.minifat()[0], 1);
        assert_eq!(mini.minifat()[1], ENDOFCHAIN);
        assert_eq!(mini.ministream_size(), 128);
    }

    #[test]
    fn empty_data_returns_endofchain() {
        let mut mini = MiniStreamEngine::new();
        let start = mini.allocate_mini(&[]);
        assert_eq!(start, ENDOFCHAIN);
        assert!(mini.is_empty());
    }

    #[test]
    fn multiple_allocations_chain_independently() {
        let mut mini = MiniStreamEngine::new();
        let start1 = mini.allocate_mini(&[0xAA; 50]);
        let start2 = mini.allocate_mini(&[0xBB; 100]);

        assert_eq!(start1, 0);
        assert_eq!(start2, 1);
        assert_eq!(mini.minifat()[0], ENDOFCHAIN);
        assert_eq!(mini.minifat()[1], 2);
        assert_eq!(mini.minifat()[2], ENDOFCHAIN);
    }
}
