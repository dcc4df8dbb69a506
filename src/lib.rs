//! cfbf - A Rust library for reading and writing the Microsoft Compound
//! File Binary Format (CFBF / OLE2 / Structured Storage).
//!
//! This library covers CFBF major version 3 (512-byte sectors), the format
//! used by legacy Microsoft Office files (.doc, .xls, .ppt) and many other
//! structured-storage containers. Version 4 (4096-byte sectors) is out of
//! scope.
//!
//! # Example - Building a container
//!
//! ```no_run
//! use cfbf::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = Document::new();
//! doc.add_stream(&["WordDocument"], b"...")?;
//! doc.add_stream(&["Data", "Summary"], b"...")?;
//!
//! let bytes = doc.render()?;
//! std::fs::write("document.doc", bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading a container
//!
//! ```no_run
//! use cfbf::{files, file_data};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("document.doc")?;
//! for entry in files(&bytes)? {
//!     let data = file_data(&bytes, &entry)?;
//!     println!("{}: {} bytes", entry.path.join("/"), data.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod consts;
pub mod document;
pub mod error;
pub mod reader;
pub mod writer;

pub use document::Document;
pub use error::{CfbError, Result};
pub use reader::{file_data, files, is_cfb_file, FileEntry};
