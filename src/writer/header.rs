//! 512-byte CFBF header generation (major version 3 only).

use crate::consts::*;

/// Builds the fixed 512-byte container header.
pub struct HeaderBuilder {
    first_dir_sector: u32,
    first_minifat_sector: u32,
    num_minifat_sectors: u32,
    first_difat_sector: u32,
    num_difat_sectors: u32,
    fat_sectors: Vec<u32>,
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self {
            first_dir_sector: 0,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }

    pub fn set_first_dir_sector(&mut self, sector: u32) {
        self.first_dir_sector = sector;
    }

    pub fn set_minifat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_minifat_sector = first_sector;
        self.num_minifat_sectors = num_sectors;
    }

    pub fn set_difat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_difat_sector = first_sector;
        self.num_difat_sectors = num_sectors;
    }

    /// Add FAT sector IDs; only the first [`HEADER_DIFAT_ENTRIES`] are
    /// stored inline, the rest live in DIFAT sectors.
    pub fn add_fat_sectors(&mut self, sectors: &[u32]) {
        self.fat_sectors.extend_from_slice(sectors);
    }

    /// Render the 512-byte header block.
    pub fn generate(&self) -> Vec<u8> {
        let mut header = vec![0u8; SECTOR_SIZE];

        header[0..8].copy_from_slice(MAGIC);
        // CLSID (8..24) stays zero: the root storage CLSID lives in the
        // directory entry, not the header.

        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes()); // minor version
        header[26..28].copy_from_slice(&3u16.to_le_bytes()); // DLL version 3
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes()); // byte order
        header[30..32].copy_from_slice(&9u16.to_le_bytes()); // sector shift: 2^9 = 512
        header[32..34].copy_from_slice(&6u16.to_le_bytes()); // mini sector shift: 2^6 = 64
        // reserved (34..40) stays zero
        // csectDir (40..44) stays zero: must be 0 for 512-byte-sector containers

        let num_fat_sectors = self.fat_sectors.len() as u32;
        header[44..48].copy_from_slice(&num_fat_sectors.to_le_bytes());
        header[48..52].copy_from_slice(&self.first_dir_sector.to_le_bytes());
        // transaction signature (52..56) stays zero
        header[56..60].copy_from_slice(&MINI_STREAM_CUTOFF.to_le_bytes());
        header[60..64].copy_from_slice(&self.first_minifat_sector.to_le_bytes());
        header[64..68].copy_from_slice(&self.num_minifat_sectors.to_le_bytes());
        header[68..72].copy_from_slice(&self.first_difat_sector.to_le_bytes());
        header[72..76].copy_from_slice(&self.num_difat_sectors.to_le_bytes());

        for (i, &sector_id) in self.fat_sectors.iter().take(HEADER_DIFAT_ENTRIES).enumerate() {
            let offset = 76 + i * 4;
            header[offset..offset + 4].copy_from_slice(&sector_id.to_le_bytes());
        }
        for i in self.fat_sectors.len().min(HEADER_DIFAT_ENTRIES)..HEADER_DIFAT_ENTRIES {
            let offset = 76 + i * 4;
            header[offset..offset + 4].copy_from_slice(&FREESECT.to_le_bytes());
        }

        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_512_byte_header_with_magic() {
        let mut builder = HeaderBuilder::new();
        builder.set_first_dir_sector(10);
        builder.add_fat_sectors(&[1, 2, 3]);

        let header = builder.generate();

        assert_eq!(header.len(), 512);
        assert_eq!(&header[0..8], MAGIC);
        assert_eq!(&header[26..28], &3u16.to_le_bytes());
        assert_eq!(&header[28..30], &0xFFFEu16.to_le_bytes());
        assert_eq!(&header[30..32], &9u16.to_le_bytes());
    }

    #[test]
    fn unused_header_fat_slots_are_freesect() {
        let builder = HeaderBuilder::new();
        let header = builder.generate();
        assert_eq!(&header[76..80], &FREESECT.to_le_bytes());
    }
}
