use std::io::Write;
use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use uuid::Uuid;

use crate::core::SignalTableRowIndex;
use crate::error::{Result, WriteError};
use crate::options::SignalType;
use crate::pool::MemoryPool;
use crate::stream::Tell;
use crate::table::{KEY_SIGNAL_TYPE, SchemaMetadata, TableKind, TableRow, TableState, TableWriter, encode};

use super::compress_signal;

/// Sample data carried by one signal row
enum SignalPayload<'a> {
    Raw(&'a [i16]),
    Compressed(&'a [u8]),
}

/// One chunk of signal belonging to a read
struct SignalRow<'a> {
    read_id: &'a Uuid,
    sample_count: u32,
    payload: SignalPayload<'a>,
}
impl TableRow for SignalRow<'_> {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        encode::write_uuid(buf, self.read_id);
        buf.write_u32::<LittleEndian>(self.sample_count)?;
        match self.payload {
            SignalPayload::Raw(samples) => {
                encode::write_len(buf, samples.len() * 2)?;
                samples
                    .iter()
                    .try_for_each(|&sample| buf.write_i16::<LittleEndian>(sample))?;
            }
            SignalPayload::Compressed(bytes) => {
                encode::write_len(buf, bytes.len())?;
                buf.extend_from_slice(bytes);
            }
        }
        Ok(())
    }
}

/// Appends signal chunks to the signal table, one chunk per row
///
/// Chunking is the caller's responsibility: every call stores exactly the
/// samples it is given as a single row.
pub struct SignalTableWriter<W: Write + Tell> {
    table: TableWriter<W>,
    signal_type: SignalType,
}
impl<W: Write + Tell> SignalTableWriter<W> {
    pub fn new(
        inner: W,
        metadata: &SchemaMetadata,
        batch_size: usize,
        signal_type: SignalType,
        pool: Arc<MemoryPool>,
    ) -> Result<Self> {
        let type_name = match signal_type {
            SignalType::Uncompressed => "uncompressed",
            SignalType::Vbz => "vbz",
        };
        let metadata = metadata.with_entry(KEY_SIGNAL_TYPE, type_name);
        let table = TableWriter::new(inner, TableKind::Signal, &metadata, batch_size, pool)?;
        Ok(Self { table, signal_type })
    }

    pub fn signal_type(&self) -> SignalType {
        self.signal_type
    }

    pub fn state(&self) -> TableState {
        self.table.state()
    }

    pub fn rows_written(&self) -> u64 {
        self.table.rows_written()
    }

    /// Appends one row holding `samples`, compressing them if the table is compressed
    pub fn add_signal(&mut self, read_id: &Uuid, samples: &[i16]) -> Result<SignalTableRowIndex> {
        let sample_count =
            u32::try_from(samples.len()).map_err(|_| WriteError::LengthOverflow(samples.len()))?;

        let compressed;
        let payload = match self.signal_type {
            SignalType::Uncompressed => SignalPayload::Raw(samples),
            SignalType::Vbz => {
                compressed = compress_signal(samples)?;
                SignalPayload::Compressed(&compressed)
            }
        };

        self.push(&SignalRow {
            read_id,
            sample_count,
            payload,
        })
    }

    /// Appends one row holding already compressed bytes
    ///
    /// `sample_count` is trusted: the bytes are not decoded to check it.
    pub fn add_pre_compressed_signal(
        &mut self,
        read_id: &Uuid,
        signal_bytes: &[u8],
        sample_count: u32,
    ) -> Result<SignalTableRowIndex> {
        if self.signal_type != SignalType::Vbz {
            return Err(WriteError::PreCompressedSignalUnsupported.into());
        }
        self.push(&SignalRow {
            read_id,
            sample_count,
            payload: SignalPayload::Compressed(signal_bytes),
        })
    }

    fn push(&mut self, row: &SignalRow) -> Result<SignalTableRowIndex> {
        let index = self.table.push(row)?;
        if self.table.is_batch_full() {
            self.table.flush_batch()?;
        }
        Ok(index)
    }

    pub fn close(&mut self) -> Result<()> {
        self.table.close()
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self) -> &mut W {
        self.table.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.table.into_inner()
    }
}
