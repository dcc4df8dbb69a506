//! The reader's per-stream result type.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// One stream discovered while walking a container's directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path, root-relative; one component per storage/stream name.
    pub path: Vec<String>,
    /// Starting regular sector. Meaningless when `mini_stream_sector` is set.
    pub start_sector: u32,
    /// Stream size in bytes.
    pub size: u64,
    /// CLSID formatted as `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, empty if
    /// the entry carries no CLSID.
    pub clsid: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// Starting mini-sector, if this stream lives in the mini-stream rather
    /// than occupying regular sectors.
    pub mini_stream_sector: Option<u32>,
}

pub(crate) fn format_clsid(bytes: &[u8; 16]) -> String {
    if bytes.iter().all(|&b| b == 0) {
        return String::new();
    }

    let mut out = String::with_capacity(36);
    let _ = write!(
        out,
        "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        bytes[3],
        bytes[2],
        bytes[1],
        bytes[0],
        bytes[5],
        bytes[4],
        bytes[7],
        bytes[6],
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15],
    );
    out
}

/// Convert a Windows FILETIME (100ns intervals since 1601-01-01) to UTC.
/// Zero is treated as "not set".
pub(crate) fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    const EPOCH_DIFF_100NS: i64 = 116_444_736_000_000_000;
    let since_unix_100ns = filetime as i64 - EPOCH_DIFF_100NS;
    let secs = since_unix_100ns.div_euclid(10_000_000);
    let nanos = (since_unix_100ns.rem_euclid(10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_clsid_formats_empty() {
        assert_eq!(format_clsid(&[0u8; 16]), "");
    }

    #[test]
    fn nonzero_clsid_formats_hyphenated_hex() {
        let bytes: [u8; 16] = [
            0x00, 0x06, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x46,
        ];
        assert_eq!(format_clsid(&bytes), "00090600-0000-0000-C000-000000000046");
    }

    #[test]
    fn zero_filetime_is_unset() {
        assert_eq!(filetime_to_datetime(0), None);
    }
}
