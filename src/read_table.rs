use std::io::Write;
use std::sync::Arc;

use crate::core::{ReadData, ReadRow, ReadTableRowIndex, SignalTableRowIndex};
use crate::dictionary::DictionaryWriters;
use crate::error::Result;
use crate::pool::MemoryPool;
use crate::stream::Tell;
use crate::table::{SchemaMetadata, TableKind, TableState, TableWriter};

/// Appends read metadata rows to the read table
///
/// Signal row indices are stored as given: the file writer only ever passes
/// indices it received from the signal table. Dictionary indices are checked
/// against the dictionaries, and any new dictionary entries are written ahead
/// of the row batch that first references them.
pub struct ReadTableWriter<W: Write + Tell> {
    table: TableWriter<W>,
}
impl<W: Write + Tell> ReadTableWriter<W> {
    pub fn new(
        inner: W,
        metadata: &SchemaMetadata,
        batch_size: usize,
        pool: Arc<MemoryPool>,
    ) -> Result<Self> {
        let table = TableWriter::new(inner, TableKind::Read, metadata, batch_size, pool)?;
        Ok(Self { table })
    }

    pub fn state(&self) -> TableState {
        self.table.state()
    }

    pub fn rows_written(&self) -> u64 {
        self.table.rows_written()
    }

    pub fn add_read(
        &mut self,
        read_data: &ReadData,
        signal_rows: &[SignalTableRowIndex],
        dictionaries: &mut DictionaryWriters,
    ) -> Result<ReadTableRowIndex> {
        dictionaries.check_read(read_data)?;

        let index = self.table.push(&ReadRow {
            data: read_data,
            signal_rows,
        })?;
        if self.table.is_batch_full() {
            self.flush(dictionaries)?;
        }
        Ok(index)
    }

    /// Writes pending dictionary entries followed by the pending rows
    fn flush(&mut self, dictionaries: &mut DictionaryWriters) -> Result<()> {
        dictionaries.write_pending(&mut self.table)?;
        self.table.flush_batch()
    }

    pub fn close(&mut self, dictionaries: &mut DictionaryWriters) -> Result<()> {
        if self.table.state() == TableState::Open {
            self.flush(dictionaries)?;
        }
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
