use std::io;

use bytemuck::{Pod, Zeroable};

use crate::error::{Result, TableError};

use super::{BATCH_MAGIC, INDEX_MAGIC, TABLE_MAGIC, TABLE_VERSION};

/// Which table a stream holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TableKind {
    Signal = 1,
    Read = 2,
}
impl TableKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Read => "read",
        }
    }
}

/// Batch content types
pub const BATCH_ROWS: u8 = 0;
pub const BATCH_DICTIONARY: u8 = 1;

/// The header at the start of every table.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct TableHeader {
    magic: [u8; 8],
    pub version: u8,
    pub kind: u8,
    padding: [u8; 2],
    /// Number of schema metadata key/value pairs following the header
    pub n_metadata: u32,
    reserved: [u8; 16],
}
impl TableHeader {
    #[must_use]
    pub fn new(kind: TableKind, n_metadata: u32) -> Self {
        Self {
            magic: *TABLE_MAGIC,
            version: TABLE_VERSION,
            kind: kind as u8,
            padding: [0; 2],
            n_metadata,
            reserved: [0; 16],
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.magic != *TABLE_MAGIC {
            return Err(TableError::InvalidTableHeaderMagic.into());
        }
        Ok(header)
    }
}

/// Precedes every compressed batch of rows.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct BatchHeader {
    magic: [u8; 4],
    /// [`BATCH_ROWS`] or [`BATCH_DICTIONARY`]
    pub content: u8,
    /// Dictionary kind for dictionary batches, zero otherwise
    pub dictionary: u8,
    padding: [u8; 2],
    pub num_rows: u64,
    /// Length of the uncompressed row bytes
    pub u_bytes: u64,
    /// Length of the compressed row bytes following this header
    pub z_bytes: u64,
}
impl BatchHeader {
    #[must_use]
    pub fn new(content: u8, dictionary: u8, num_rows: u64, u_bytes: u64, z_bytes: u64) -> Self {
        Self {
            magic: *BATCH_MAGIC,
            content,
            dictionary,
            padding: [0; 2],
            num_rows,
            u_bytes,
            z_bytes,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.magic != *BATCH_MAGIC {
            return Err(TableError::InvalidBatchHeaderMagic.into());
        }
        Ok(header)
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

/// Precedes the zstd-compressed batch index at the end of a table
///
/// The index is a packed array of [`BatchRange`], one per batch in write
/// order. `raw_len` sizes the decompression buffer.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct IndexHeader {
    magic: [u8; 8],
    /// Length of the packed `BatchRange` array
    pub raw_len: u64,
    /// Length of the compressed index following this header
    pub compressed_len: u64,
}
impl IndexHeader {
    #[must_use]
    pub fn new(raw_len: u64, compressed_len: u64) -> Self {
        Self {
            magic: *INDEX_MAGIC,
            raw_len,
            compressed_len,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        check_index_magic(&header.magic)?;
        Ok(header)
    }
}

/// Trailing 16 bytes of a table
///
/// Holds the compressed index length so the index can be found by seeking
/// back from the end of the table, without walking its batches. The table
/// end is the file end for a standalone table, or `file_start_offset +
/// file_length` of its footer entry when embedded.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct IndexFooter {
    /// Equal to [`IndexHeader::compressed_len`]
    pub index_len: u64,
    magic: [u8; 8],
}
impl IndexFooter {
    #[must_use]
    pub fn new(index_len: u64) -> Self {
        Self {
            index_len,
            magic: *INDEX_MAGIC,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let footer: Self = bytemuck::pod_read_unaligned(bytes);
        check_index_magic(&footer.magic)?;
        Ok(footer)
    }
}

fn check_index_magic(magic: &[u8; 8]) -> Result<()> {
    if magic == INDEX_MAGIC {
        Ok(())
    } else {
        Err(TableError::InvalidIndexMagic.into())
    }
}

/// One batch index entry
///
/// Offsets count from the first byte of the table, not of the file, so a
/// table spliced into a combined file keeps a valid index without rewriting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod, Default)]
#[repr(C)]
pub struct BatchRange {
    /// Table-relative offset of the batch header
    pub offset: u64,
    /// Table rows written up to the end of this batch, dictionary rows excluded
    pub cumulative_rows: u64,
    /// [`BATCH_ROWS`] or [`BATCH_DICTIONARY`]
    pub content: u8,
    /// Dictionary kind of a dictionary batch, zero otherwise
    pub dictionary: u8,
    padding: [u8; 6],
}
impl BatchRange {
    #[must_use]
    pub fn new(offset: u64, cumulative_rows: u64, content: u8, dictionary: u8) -> Self {
        Self {
            offset,
            cumulative_rows,
            content,
            dictionary,
            padding: [0; 6],
        }
    }
}
