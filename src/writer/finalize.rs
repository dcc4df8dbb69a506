//! FAT/DIFAT fixed-point sizing and render orchestration.
//!
//! Reserving sectors for the FAT itself can push the FAT past 109 sectors,
//! which in turn requires DIFAT sectors, which are themselves tracked in
//! the FAT. Sizing is solved by iterating until the sector counts stop
//! growing, following the teacher's `OleWriter::write_to` convergence loop.

use crate::consts::*;
use crate::document::Document;
use crate::error::{CfbError, Result};
use crate::writer::difat::DifatBuilder;
use crate::writer::directory::DirectoryBuilder;
use crate::writer::header::HeaderBuilder;
use std::io::{Cursor, Seek, SeekFrom, Write};

/// Iterate the self-referential FAT/DIFAT sector count to a fixed point.
///
/// `n_used` is the sector count already committed for stream data, the
/// mini-stream, the mini-FAT, and the directory. Converges within a handful
/// of iterations since each round only ever adds sectors that are needed to
/// describe the previous round's sectors.
fn fixed_point_fat_difat_counts(n_used: u32) -> (u32, u32) {
    let entries_per_fat_sector = (SECTOR_SIZE / 4) as u32;
    let ids_per_difat_sector = entries_per_fat_sector - 1;

    let mut n_fat = 0u32;
    let mut n_difat = 0u32;
    for _ in 0..8 {
        let total = n_used + n_fat + n_difat;
        let new_n_fat = total.div_ceil(entries_per_fat_sector);
        let new_n_difat = if new_n_fat > HEADER_DIFAT_ENTRIES as u32 {
            (new_n_fat - HEADER_DIFAT_ENTRIES as u32).div_ceil(ids_per_difat_sector)
        } else {
            0
        };
        if new_n_fat == n_fat && new_n_difat == n_difat {
            break;
        }
        n_fat = new_n_fat;
        n_difat = new_n_difat;
    }
    (n_fat, n_difat)
}

fn pad_to_sector(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    let mut padded = data.to_vec();
    padded.resize(padded_len, 0);
    padded
}

fn write_at_sector<W: Write + Seek>(writer: &mut W, sector: u32, data: &[u8]) -> Result<()> {
    let position = ((sector as u64) + 1) * (SECTOR_SIZE as u64);
    writer.seek(SeekFrom::Start(position))?;
    writer.write_all(data)?;
    Ok(())
}

/// Render a document's pending streams/storages into CFBF container bytes.
///
/// Per-stream sectors were already allocated at insertion time
/// ([`Document::add_stream`]); this finishes the container by allocating
/// the mini-stream, the directory, the mini-FAT, and the FAT/DIFAT
/// regions, then serializes every sector in order.
pub(crate) fn render(document: &Document) -> Result<Vec<u8>> {
    let mut fat = document.fat.clone();
    let mut mini = document.mini.clone();

    let (ministream_start, ministream_size) = if !mini.is_empty() {
        let start = fat.allocate_chain(mini.ministream_data().len());
        (start, mini.ministream_size())
    } else {
        (ENDOFCHAIN, 0u64)
    };

    let mut directory = DirectoryBuilder::new(ministream_start, ministream_size);
    if document.root_clsid != [0u8; 16] {
        directory.set_root_clsid(document.root_clsid);
    }

    for storage_path in &document.explicit_storages {
        directory.add_storage_path(storage_path);
    }
    for object in &document.streams {
        directory.add_stream_path(&object.path, object.start_sector, object.size);
    }

    let dir_stream = directory.generate_directory_stream();
    let dir_start_sector = fat.allocate_chain(dir_stream.len());

    let (minifat_start_sector, num_minifat_sectors) = if !mini.is_empty() {
        let minifat_sectors = mini.generate_minifat_sectors();
        let num_sectors = minifat_sectors.len() as u32;
        if num_sectors > 0 {
            (fat.allocate_chain(num_sectors as usize * SECTOR_SIZE), num_sectors)
        } else {
            (ENDOFCHAIN, 0)
        }
    } else {
        (ENDOFCHAIN, 0)
    };

    let (n_fat, n_difat) = fixed_point_fat_difat_counts(fat.total_sectors());

    let difat_start_sector = if n_difat > 0 {
        fat.allocate_special(n_difat, DIFSECT)
    } else {
        ENDOFCHAIN
    };
    let fat_start_sector = if n_fat > 0 {
        fat.allocate_special(n_fat, FATSECT)
    } else {
        ENDOFCHAIN
    };

    let fat_sectors_data = fat.generate_fat_sectors();
    fat.validate().map_err(CfbError::MalformedHeader)?;

    let fat_sector_ids: Vec<u32> = if n_fat > 0 {
        (fat_start_sector..fat_start_sector + n_fat).collect()
    } else {
        Vec::new()
    };

    let (num_difat_sectors, difat_sectors) = if n_fat as usize > HEADER_DIFAT_ENTRIES {
        let mut difat = DifatBuilder::new();
        difat.set_fat_sectors(&fat_sector_ids);
        let num_difat = difat.calculate_difat_sector_count();
        let sectors = if num_difat > 0 {
            difat.generate_difat_sectors(difat_start_sector)
        } else {
            Vec::new()
        };
        (num_difat, sectors)
    } else {
        (0, Vec::new())
    };

    let mut header_builder = HeaderBuilder::new();
    header_builder.set_first_dir_sector(dir_start_sector);
    header_builder.set_minifat(minifat_start_sector, num_minifat_sectors);
    header_builder.add_fat_sectors(&fat_sector_ids);
    if num_difat_sectors > 0 {
        header_builder.set_difat(difat_start_sector, num_difat_sectors);
    }
    let header = header_builder.generate();

    let mut out = Cursor::new(Vec::new());
    out.write_all(&header)?;

    if !mini.is_empty() && ministream_start != ENDOFCHAIN {
        write_at_sector(&mut out, ministream_start, &pad_to_sector(mini.ministream_data()))?;
    }

    for object in &document.streams {
        if object.is_mini || object.start_sector == ENDOFCHAIN {
            continue;
        }
        write_at_sector(&mut out, object.start_sector, &pad_to_sector(&object.data))?;
    }

    write_at_sector(&mut out, dir_start_sector, &pad_to_sector(&dir_stream))?;

    if !mini.is_empty() && minifat_start_sector != ENDOFCHAIN {
        let mut current = minifat_start_sector;
        for sector_data in mini.generate_minifat_sectors() {
            write_at_sector(&mut out, current, &sector_data)?;
            current += 1;
        }
    }

    for (i, sector_data) in fat_sectors_data.iter().enumerate() {
        write_at_sector(&mut out, fat_start_sector + i as u32, sector_data)?;
    }

    for (i, sector_data) in difat_sectors.iter().enumerate() {
        write_at_sector(&mut out, difat_start_sector + i as u32, sector_data)?;
    }

    out.flush()?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_for_small_document() {
        assert_eq!(fixed_point_fat_difat_counts(1), (1, 0));
    }

    #[test]
    fn converges_past_header_difat_entries() {
        // Past 109 FAT sectors the loop must also account for DIFAT sectors
        // feeding back into the FAT sector count.
        let (n_fat, n_difat) = fixed_point_fat_difat_counts(14_000);
        assert!(n_fat > HEADER_DIFAT_ENTRIES as u32);
        assert!(n_difat > 0);
    }
}
