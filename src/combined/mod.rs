//! # Combined file layout
//!
//! A combined file embeds the signal table and the read table in one file.
//! Every section boundary is padded to 8 bytes and followed by the file's
//! section marker, a UUID drawn once when the file is created. The file ends
//! with a footer locating both tables.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Signature                    │ 8 bytes
//! │ Section Marker               │ 16 bytes
//! │ Combined Header              │ 24 bytes (file identifier + version)
//! │ Section Marker               │ 16 bytes
//! ├──────────────────────────────┤
//! │ Signal Table                 │ starts at byte 64
//! ├──────────────────────────────┤
//! │ Padding to 8 bytes           │
//! │ Section Marker               │ 16 bytes
//! ├──────────────────────────────┤
//! │ Read Table                   │ spliced from the temporary reads file
//! ├──────────────────────────────┤
//! │ Padding to 8 bytes           │
//! │ Section Marker               │ 16 bytes
//! ├──────────────────────────────┤
//! │ Footer                       │ identifier, software, version, FileInfo x2
//! │ Footer Length                │ 8 bytes
//! │ Section Marker               │ 16 bytes
//! │ Signature                    │ 8 bytes
//! └──────────────────────────────┘
//! ```
//!
//! A file missing its trailing signature was not closed successfully and
//! must be discarded.

mod assembler;
mod footer;
mod header;

pub(crate) use assembler::CombinedState;
pub use footer::{FileInfo, Footer, FooterFields, write_footer};
pub use header::{CombinedHeader, pad_to_alignment, write_combined_header, write_section_marker};

/// Signature at the start and end of every combined file
pub const FILE_SIGNATURE: &[u8; 8] = b"\x8BPOD\r\n\x1A\n";

/// The magic number opening the footer
pub const FOOTER_MAGIC: &[u8; 8] = b"FOOTER\0\0";

/// Alignment of every section boundary
pub const SECTION_ALIGNMENT: u64 = 8;

/// Size of a section marker on disk
pub const SECTION_MARKER_SIZE: u64 = 16;

/// Size of the combined header including its framing markers
pub const COMBINED_HEADER_SIZE: u64 = 64;

/// Block size used when splicing the reads file into the combined file
pub const SPLICE_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Suffix of the hidden temporary reads file, `.<basename>.tmp-reads`
pub const READS_TMP_SUFFIX: &str = ".tmp-reads";
