//! 512-byte CFBF header parsing (major version 3 only).

use crate::consts::*;
use crate::error::{CfbError, Result};
use zerocopy::{FromBytes, LE, U16, U32};

/// Parsed fields of a container's 512-byte header.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub first_dir_sector: u32,
    pub mini_stream_cutoff: u32,
    pub first_minifat_sector: u32,
    pub num_minifat_sectors: u32,
    pub first_difat_sector: u32,
    pub num_difat_sectors: u32,
    /// FAT sector IDs stored inline in the header (up to
    /// [`HEADER_DIFAT_ENTRIES`]).
    pub header_fat_sectors: Vec<u32>,
}

fn read_u16(header: &[u8], offset: usize) -> u16 {
    U16::<LE>::read_from_bytes(&header[offset..offset + 2])
        .map(|v| v.get())
        .unwrap_or(0)
}

fn read_u32(header: &[u8], offset: usize) -> u32 {
    U32::<LE>::read_from_bytes(&header[offset..offset + 4])
        .map(|v| v.get())
        .unwrap_or(0)
}

/// Parse and validate the header at the start of `bytes`.
pub(crate) fn parse(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < MINIMAL_CFBF_SIZE {
        return Err(CfbError::NotCfbFile);
    }

    let header = &bytes[0..SECTOR_SIZE];
    if &header[0..8] != MAGIC {
        return Err(CfbError::NotCfbFile);
    }

    let dll_version = read_u16(header, 0x1A);
    let byte_order = read_u16(header, 0x1C);
    let sector_shift = read_u16(header, 0x1E);
    let mini_sector_shift = read_u16(header, 0x20);

    if byte_order != 0xFFFE {
        return Err(CfbError::MalformedHeader("byte order must be little-endian".to_string()));
    }
    if dll_version != 3 {
        return Err(CfbError::MalformedHeader(
            "only major version 3 (512-byte sectors) is supported".to_string(),
        ));
    }
    if (1usize << sector_shift) != SECTOR_SIZE {
        return Err(CfbError::MalformedHeader("sector size must be 512 bytes".to_string()));
    }
    if (1usize << mini_sector_shift) != MINI_SECTOR_SIZE {
        return Err(CfbError::MalformedHeader("mini sector size must be 64 bytes".to_string()));
    }

    let num_fat_sectors = read_u32(header, 0x2C);
    let first_dir_sector = read_u32(header, 0x30);
    let mini_stream_cutoff = read_u32(header, 0x38);
    let first_minifat_sector = read_u32(header, 0x3C);
    let num_minifat_sectors = read_u32(header, 0x40);
    let first_difat_sector = read_u32(header, 0x44);
    let num_difat_sectors = read_u32(header, 0x48);

    let mut header_fat_sectors = Vec::with_capacity(num_fat_sectors.min(HEADER_DIFAT_ENTRIES as u32) as usize);
    for i in 0..HEADER_DIFAT_ENTRIES {
        let offset = 0x4C + i * 4;
        let sector = read_u32(header, offset);
        if sector == FREESECT || sector == ENDOFCHAIN {
            break;
        }
        header_fat_sectors.push(sector);
    }

    Ok(Header {
        first_dir_sector,
        mini_stream_cutoff,
        first_minifat_sector,
        num_minifat_sectors,
        first_difat_sector,
        num_difat_sectors,
        header_fat_sectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_small_input() {
        assert!(matches!(parse(&[0u8; 10]), Err(CfbError::NotCfbFile)));
    }

    #[test]
    fn rejects_missing_magic() {
        let bytes = vec![0u8; MINIMAL_CFBF_SIZE];
        assert!(matches!(parse(&bytes), Err(CfbError::NotCfbFile)));
    }
}
