//! Sentinel values and fixed sizes for the CFBF/OLE2 container format.
//!
//! This crate implements exactly CFBF major version 3 (512-byte sectors);
//! version 4 (4096-byte sectors) is out of scope.

/// Magic bytes that must open every CFBF container.
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Minimal size of an empty container: header + one directory sector + one
/// FAT sector (1536 bytes).
pub const MINIMAL_CFBF_SIZE: usize = 1536;

/// Size of a regular sector in bytes (version 3 only).
pub const SECTOR_SIZE: usize = 512;

/// Size of a mini-sector in bytes.
pub const MINI_SECTOR_SIZE: usize = 64;

/// Size of a directory entry on disk.
pub const DIRENTRY_SIZE: usize = 128;

/// Streams smaller than this many bytes live in the mini-stream instead of
/// the regular FAT region. The cutoff is strict: `size < MINI_STREAM_CUTOFF`.
pub const MINI_STREAM_CUTOFF: u32 = 4096;

/// Largest stream size this crate will write (2 GiB - 1).
pub const MAX_STREAM_SIZE: u64 = 2_147_483_647;

/// Number of FAT sector IDs stored directly in the header; overflow goes to
/// chained DIFAT sectors.
pub const HEADER_DIFAT_ENTRIES: usize = 109;

// Sector ID sentinels (unsigned 32-bit, little-endian on disk).
/// Highest ordinary sector ID.
pub const MAXREGSECT: u32 = 0xFFFFFFFA;
/// This FAT slot names a DIFAT sector.
pub const DIFSECT: u32 = 0xFFFFFFFC;
/// This FAT slot names a FAT sector.
pub const FATSECT: u32 = 0xFFFFFFFD;
/// Chain terminator.
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE;
/// Unused slot.
pub const FREESECT: u32 = 0xFFFFFFFF;
/// Directory "no sibling/child".
pub const NOSTREAM: u32 = 0xFFFFFFFF;

// Directory entry types (on-disk `u8`).
/// Empty/unused directory entry slot.
pub const STGTY_EMPTY: u8 = 0;
/// Storage (directory-like) entry.
pub const STGTY_STORAGE: u8 = 1;
/// Stream (file-like) entry.
pub const STGTY_STREAM: u8 = 2;
/// Root storage entry (always directory entry 0).
pub const STGTY_ROOT: u8 = 5;
