//! # Table format
//!
//! Both the signal table and the read table are written as a sequence of
//! compressed row batches framed by a header and a batch index:
//!
//! ```text
//! ┌───────────────────┐
//! │   Table Header    │ 32 bytes
//! ├───────────────────┤
//! │  Schema Metadata  │ key/value pairs
//! ├───────────────────┤
//! │   Batch Header    │ 32 bytes
//! ├───────────────────┤
//! │  zstd(row bytes)  │ Variable size
//! ├───────────────────┤
//! │       ...         │ More batches
//! ├───────────────────┤
//! │   Index Header    │ 24 bytes
//! ├───────────────────┤
//! │ Compressed Index  │ Variable size
//! ├───────────────────┤
//! │   Index Footer    │ 16 bytes
//! └───────────────────┘
//! ```
//!
//! Batches hold either table rows or dictionary entries. Dictionary batches
//! are only found in the read table, where each one carries the entries
//! added to one dictionary since the previous row batch.

pub(crate) mod encode;
mod header;
mod metadata;
mod writer;

pub use header::{
    BATCH_DICTIONARY, BATCH_ROWS, BatchHeader, BatchRange, IndexFooter, IndexHeader, TableHeader,
    TableKind,
};
pub use metadata::{
    KEY_FILE_IDENTIFIER, KEY_SIGNAL_TYPE, KEY_VERSION, KEY_WRITING_SOFTWARE, SchemaMetadata,
};
pub use writer::{TableState, TableWriter};

use crate::Result;

/// The magic number for tables
pub const TABLE_MAGIC: &[u8; 8] = b"P5TABLE\0";

/// The magic number for batches
pub const BATCH_MAGIC: &[u8; 4] = b"BTCH";

/// The magic number for the batch index
pub const INDEX_MAGIC: &[u8; 8] = b"P5INDEX\0";

/// The current table layout version
pub const TABLE_VERSION: u8 = 1;

/// The zstd level used for row batches
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 1;

/// A value that can be appended as one table row
pub trait TableRow {
    /// Appends the little-endian encoding of this row to `buf`
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal table parser used to inspect written files in tests

    use std::io::Read;

    use byteorder::{LittleEndian, ReadBytesExt};
    use uuid::Uuid;

    use super::{BATCH_MAGIC, BatchHeader, BatchRange, IndexFooter, IndexHeader, TableHeader};
    use crate::Result;

    pub(crate) struct ParsedBatch {
        /// Offset of the batch header relative to the table start
        pub(crate) offset: u64,
        pub(crate) header: BatchHeader,
        /// Decompressed row bytes
        pub(crate) rows: Vec<u8>,
    }

    pub(crate) struct ParsedTable {
        pub(crate) header: TableHeader,
        pub(crate) metadata: Vec<(String, String)>,
        pub(crate) batches: Vec<ParsedBatch>,
        pub(crate) ranges: Vec<BatchRange>,
    }
    impl ParsedTable {
        pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
            let header = TableHeader::from_bytes(&bytes[..size_of::<TableHeader>()])?;
            let mut rest = &bytes[size_of::<TableHeader>()..];

            let mut metadata = Vec::new();
            for _ in 0..header.n_metadata {
                let key = read_string(&mut rest)?;
                let value = read_string(&mut rest)?;
                metadata.push((key, value));
            }

            let mut batches = Vec::new();
            while rest.starts_with(BATCH_MAGIC) {
                let offset = (bytes.len() - rest.len()) as u64;
                let header = BatchHeader::from_bytes(&rest[..size_of::<BatchHeader>()])?;
                rest = &rest[size_of::<BatchHeader>()..];
                let (z_rows, tail) = rest.split_at(header.z_bytes as usize);
                let rows = zstd::bulk::decompress(z_rows, header.u_bytes as usize)?;
                rest = tail;
                batches.push(ParsedBatch {
                    offset,
                    header,
                    rows,
                });
            }

            let index_header = IndexHeader::from_bytes(&rest[..size_of::<IndexHeader>()])?;
            rest = &rest[size_of::<IndexHeader>()..];
            let (z_index, tail) = rest.split_at(index_header.compressed_len as usize);
            let index = zstd::bulk::decompress(z_index, index_header.raw_len as usize)?;
            let footer = IndexFooter::from_bytes(tail)?;
            assert_eq!(footer.index_len, index_header.compressed_len);

            let ranges = index
                .chunks_exact(size_of::<BatchRange>())
                .map(bytemuck::pod_read_unaligned)
                .collect();

            Ok(Self {
                header,
                metadata,
                batches,
                ranges,
            })
        }

        /// Row batches only, in order
        pub(crate) fn row_batches(&self) -> impl Iterator<Item = &ParsedBatch> {
            self.batches
                .iter()
                .filter(|batch| batch.header.content == super::BATCH_ROWS)
        }
    }

    fn read_uuid(rest: &mut &[u8]) -> Result<Uuid> {
        let mut id = [0u8; 16];
        rest.read_exact(&mut id)?;
        Ok(Uuid::from_bytes(id))
    }

    /// (read id, sample count, payload) of every signal row
    pub(crate) fn signal_rows(table: &ParsedTable) -> Result<Vec<(Uuid, u32, Vec<u8>)>> {
        let mut rows = Vec::new();
        for batch in table.row_batches() {
            let mut rest = batch.rows.as_slice();
            while !rest.is_empty() {
                let id = read_uuid(&mut rest)?;
                let samples = rest.read_u32::<LittleEndian>()?;
                let len = rest.read_u32::<LittleEndian>()? as usize;
                let (payload, tail) = rest.split_at(len);
                rows.push((id, samples, payload.to_vec()));
                rest = tail;
            }
        }
        Ok(rows)
    }

    /// (read id, read number, signal rows) of every read row
    pub(crate) fn read_rows(table: &ParsedTable) -> Result<Vec<(Uuid, u32, Vec<u64>)>> {
        let mut reads = Vec::new();
        for batch in table.row_batches() {
            let mut rest = batch.rows.as_slice();
            while !rest.is_empty() {
                let id = read_uuid(&mut rest)?;
                let _pore = rest.read_u16::<LittleEndian>()?;
                let _calibration = rest.read_u16::<LittleEndian>()?;
                let read_number = rest.read_u32::<LittleEndian>()?;
                let _start_sample = rest.read_u64::<LittleEndian>()?;
                let _median_before = rest.read_f32::<LittleEndian>()?;
                let _end_reason = rest.read_u16::<LittleEndian>()?;
                let _run_info = rest.read_u16::<LittleEndian>()?;
                let n_rows = rest.read_u32::<LittleEndian>()?;
                let rows = (0..n_rows)
                    .map(|_| rest.read_u64::<LittleEndian>())
                    .collect::<std::io::Result<Vec<_>>>()?;
                reads.push((id, read_number, rows));
            }
        }
        Ok(reads)
    }

    pub(crate) fn read_string<R: Read>(reader: &mut R) -> Result<String> {
        let len = reader.read_u32::<LittleEndian>()? as usize;
        let mut buf = vec![0; len];
        reader.read_exact(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
