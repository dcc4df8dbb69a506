//! FAT/DIFAT chain reconstruction and sector-chain reads.

use super::header::Header;
use crate::consts::*;
use crate::error::{CfbError, Result};
use std::collections::HashSet;
use zerocopy::{FromBytes, LE, U32};

/// Slice out one regular sector's bytes (sector index is 0-based, counted
/// past the 512-byte header).
pub(crate) fn read_sector(bytes: &[u8], sector_id: u32) -> Result<&[u8]> {
    let position = (sector_id as u64 + 1) * SECTOR_SIZE as u64;
    let end = position + SECTOR_SIZE as u64;
    if end > bytes.len() as u64 {
        return Err(CfbError::OutOfRangeSector {
            sector: sector_id,
            limit: (bytes.len() / SECTOR_SIZE) as u32,
        });
    }
    Ok(&bytes[position as usize..end as usize])
}

/// Walk the DIFAT chain (header-embedded entries plus any DIFAT sectors) and
/// assemble the full FAT table.
pub(crate) fn load_fat(bytes: &[u8], header: &Header) -> Result<Vec<u32>> {
    let mut fat_sectors = header.header_fat_sectors.clone();

    if header.num_difat_sectors > 0 {
        let entries_per_sector = SECTOR_SIZE / 4 - 1;
        let mut difat_sector = header.first_difat_sector;
        let mut visited = HashSet::new();

        for _ in 0..header.num_difat_sectors {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            if !visited.insert(difat_sector) {
                return Err(CfbError::CyclicChain { start: header.first_difat_sector });
            }

            let sector_data = read_sector(bytes, difat_sector)?;
            for i in 0..entries_per_sector {
                let offset = i * 4;
                let sector =
                    U32::<LE>::read_from_bytes(&sector_data[offset..offset + 4]).map(|v| v.get()).unwrap_or(0);
                if sector == FREESECT || sector == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(sector);
            }

            let next_offset = entries_per_sector * 4;
            difat_sector = U32::<LE>::read_from_bytes(&sector_data[next_offset..next_offset + 4])
                .map(|v| v.get())
                .unwrap_or(ENDOFCHAIN);
        }
    }

    let entries_per_sector = SECTOR_SIZE / 4;
    let mut fat = Vec::with_capacity(fat_sectors.len() * entries_per_sector);
    for &sector_id in &fat_sectors {
        let sector_data = read_sector(bytes, sector_id)?;
        for chunk in sector_data.chunks_exact(4) {
            fat.push(U32::<LE>::read_from_bytes(chunk).map(|v| v.get()).unwrap_or(FREESECT));
        }
    }
    Ok(fat)
}

/// Follow a regular-sector chain starting at `start_sector`, returning the
/// sector IDs in order. Detects out-of-range and cyclic chains.
pub(crate) fn chain(fat: &[u32], start_sector: u32) -> Result<Vec<u32>> {
    if start_sector == ENDOFCHAIN || start_sector == FREESECT {
        return Ok(Vec::new());
    }

    let mut sectors = Vec::new();
    let mut visited = HashSet::new();
    let mut sector = start_sector;
    while sector != ENDOFCHAIN {
        if sector as usize >= fat.len() {
            return Err(CfbError::CorruptFat { sector });
        }
        if !visited.insert(sector) {
            return Err(CfbError::CyclicChain { start: start_sector });
        }
        sectors.push(sector);
        sector = fat[sector as usize];
    }
    Ok(sectors)
}

/// Read and concatenate every sector in a chain.
pub(crate) fn read_stream(bytes: &[u8], fat: &[u32], start_sector: u32) -> Result<Vec<u8>> {
    let sectors = chain(fat, start_sector)?;
    let mut data = Vec::with_capacity(sectors.len() * SECTOR_SIZE);
    for sector in sectors {
        data.extend_from_slice(read_sector(bytes, sector)?);
    }
    Ok(data)
}

/// Parse the mini-FAT table out of the mini-FAT stream.
pub(crate) fn load_minifat(bytes: &[u8], fat: &[u32], header: &Header) -> Result<Vec<u32>> {
    if header.num_minifat_sectors == 0 {
        return Ok(Vec::new());
    }
    let minifat_data = read_stream(bytes, fat, header.first_minifat_sector)?;
    let mut minifat = Vec::with_capacity(minifat_data.len() / 4);
    for chunk in minifat_data.chunks_exact(4) {
        minifat.push(U32::<LE>::read_from_bytes(chunk).map(|v| v.get()).unwrap_or(FREESECT));
    }
    Ok(minifat)
}

/// Follow a mini-sector chain inside the mini-stream and return `size`
/// bytes of it.
pub(crate) fn read_mini_stream(
    ministream: &[u8],
    minifat: &[u32],
    start_sector: u32,
    size: u64,
) -> Result<Vec<u8>> {
    let mut sectors = Vec::new();
    let mut visited = HashSet::new();
    let mut sector = start_sector;
    while sector != ENDOFCHAIN {
        if sector as usize >= minifat.len() {
            return Err(CfbError::CorruptFat { sector });
        }
        if !visited.insert(sector) {
            return Err(CfbError::CyclicChain { start: start_sector });
        }
        sectors.push(sector);
        sector = minifat[sector as usize];
    }

    let mut data = Vec::with_capacity(size as usize);
    for sector in sectors {
        let position = sector as usize * MINI_SECTOR_SIZE;
        let end = position + MINI_SECTOR_SIZE;
        if end > ministream.len() {
            return Err(CfbError::OutOfRangeSector {
                sector,
                limit: (ministream.len() / MINI_SECTOR_SIZE) as u32,
            });
        }
        data.extend_from_slice(&ministream[position..end]);
    }
    data.truncate(size as usize);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_endofchain_is_empty() {
        assert_eq!(chain(&[], ENDOFCHAIN).unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn chain_detects_cycles() {
        let fat = vec![1u32, 0u32];
        assert!(matches!(chain(&fat, 0), Err(CfbError::CyclicChain { .. })));
    }

    #[test]
    fn chain_follows_links_to_end() {
        let fat = vec![1u32, 2u32, ENDOFCHAIN];
        assert_eq!(chain(&fat, 0).unwrap(), vec![0, 1, 2]);
    }
}
