//! Unified error type for reading and writing CFBF containers.
use thiserror::Error;

/// Errors produced while building or parsing a compound file.
#[derive(Error, Debug)]
pub enum CfbError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempted to render a document with no streams
    #[error("document has no streams")]
    Empty,

    /// A single stream exceeds the maximum size this writer supports
    #[error("stream {id} size {size} exceeds the maximum allowed size")]
    FileSizeLimitExceeded { id: u32, size: u64 },

    /// A stream or storage name does not fit in a 128-byte directory entry
    #[error("filename too long: {name}")]
    FilenameTooLong { name: String },

    /// A path is empty, contains an empty component, or an illegal character
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    /// The input bytes do not start with the CFBF magic number
    #[error("not a compound file")]
    NotCfbFile,

    /// The header failed validation
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A sector ID referenced a sector beyond the end of the container
    #[error("sector {sector} out of range (limit {limit})")]
    OutOfRangeSector { sector: u32, limit: u32 },

    /// The FAT itself is internally inconsistent
    #[error("corrupt FAT at sector {sector}")]
    CorruptFat { sector: u32 },

    /// A sector chain loops back on itself
    #[error("cyclic sector chain starting at {start}")]
    CyclicChain { start: u32 },

    /// A directory entry's name could not be decoded as UTF-16LE
    #[error("invalid UTF-16 entry name")]
    InvalidUtf16Name,

    /// A requested entry does not exist in the container
    #[error("entry not found")]
    EntryNotFound,
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CfbError>;
