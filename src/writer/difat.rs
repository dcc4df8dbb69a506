//! DIFAT (Double Indirect FAT) generation.
//!
//! The header stores the first 109 FAT sector IDs directly. Containers
//! whose FAT needs more sectors than that chain the overflow through DIFAT
//! sectors, each holding `(SECTOR_SIZE / 4) - 1` FAT sector IDs plus a
//! pointer to the next DIFAT sector.

use crate::consts::*;

/// Builds DIFAT sectors for the FAT sector IDs beyond the header's 109.
#[derive(Debug, Default)]
pub struct DifatBuilder {
    overflow_fat_sector_ids: Vec<u32>,
}

impl DifatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the complete list of FAT sector IDs; only the IDs beyond the
    /// first [`HEADER_DIFAT_ENTRIES`] are kept.
    pub fn set_fat_sectors(&mut self, fat_sectors: &[u32]) {
        self.overflow_fat_sector_ids = if fat_sectors.len() > HEADER_DIFAT_ENTRIES {
            fat_sectors[HEADER_DIFAT_ENTRIES..].to_vec()
        } else {
            Vec::new()
        };
    }

    /// Number of DIFAT sectors needed for the overflow FAT sector IDs.
    pub fn calculate_difat_sector_count(&self) -> u32 {
        if self.overflow_fat_sector_ids.is_empty() {
            return 0;
        }
        let ids_per_sector = (SECTOR_SIZE / 4) - 1;
        self.overflow_fat_sector_ids.len().div_ceil(ids_per_sector) as u32
    }

    /// Whether any DIFAT sectors are needed at all.
    pub fn is_needed(&self) -> bool {
        !self.overflow_fat_sector_ids.is_empty()
    }

    /// Serialize the DIFAT chain starting at `first_difat_sector`.
    pub fn generate_difat_sectors(&self, first_difat_sector: u32) -> Vec<Vec<u8>> {
        if self.overflow_fat_sector_ids.is_empty() {
            return Vec::new();
        }

        let ids_per_sector = (SECTOR_SIZE / 4) - 1;
        let num_sectors = self.calculate_difat_sector_count();
        let mut sectors = Vec::with_capacity(num_sectors as usize);

        for idx in 0..num_sectors {
            let mut sector_data = vec![0xFFu8; SECTOR_SIZE];

            let start = (idx as usize) * ids_per_sector;
            let end = ((idx as usize + 1) * ids_per_sector).min(self.overflow_fat_sector_ids.len());

            for (i, &id) in self.overflow_fat_sector_ids[start..end].iter().enumerate() {
                let offset = i * 4;
                sector_data[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
            }

            let next_pointer_offset = SECTOR_SIZE - 4;
            let next_difat_sector = if idx < num_sectors - 1 {
                first_difat_sector + idx + 1
            } else {
                ENDOFCHAIN
            };
            sector_data[next_pointer_offset..next_pointer_offset + 4]
                .copy_from_slice(&next_difat_sector.to_le_bytes());

            sectors.push(sector_data);
        }

        sectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_difat_needed_under_109_fat_sectors() {
        let difat = DifatBuilder::new();
        assert!(!difat.is_needed());
        assert_eq!(difat.calculate_difat_sector_count(), 0);
    }

    #[test]
    fn overflow_past_header_needs_one_difat_sector() {
        let mut difat = DifatBuilder::new();
        let fat_sectors: Vec<u32> = (0..150).collect();
        difat.set_fat_sectors(&fat_sectors);

        assert!(difat.is_needed());
        // 150 - 109 = 41 overflow IDs; 127 fit per sector.
        assert_eq!(difat.calculate_difat_sector_count(), 1);
    }

    #[test]
    fn chain_pointer_links_and_terminates() {
        let mut difat = DifatBuilder::new();
        let fat_sectors: Vec<u32> = (0..250).collect();
        difat.set_fat_sectors(&fat_sectors);
        assert_eq!(difat.calculate_difat_sector_count(), 2);

        let sectors = difat.generate_difat_sectors(300);
        assert_eq!(sectors.len(), 2);

        let next_offset = SECTOR_SIZE - 4;
        let next = u32::from_le_bytes(sectors[0][next_offset..next_offset + 4].try_into().unwrap());
        assert_eq!(next, 301);

        let last = u32::from_le_bytes(sectors[1][next_offset..next_offset + 4].try_into().unwrap());
        assert_eq!(last, ENDOFCHAIN);
    }
}
