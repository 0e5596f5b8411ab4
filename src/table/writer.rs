use std::io::Write;
use std::sync::Arc;

use tracing::{debug, warn};
use zstd::stream::copy_encode;
use zstd::zstd_safe;

use crate::error::{Result, TableError};
use crate::pool::MemoryPool;
use crate::stream::Tell;

use super::encode::sized_compress;
use super::header::{
    BATCH_DICTIONARY, BATCH_ROWS, BatchHeader, BatchRange, IndexFooter, IndexHeader, TableHeader,
    TableKind,
};
use super::{DEFAULT_COMPRESSION_LEVEL, SchemaMetadata, TableRow};

/// Initial reservation for the per-batch row buffer
const BATCH_BUFFER_CAPACITY: usize = 64 * 1024;

/// Lifecycle of a table writer
///
/// A table only moves forward: `Open -> Closing -> Closed`. Any failed write
/// to the stream moves it to `Failed` instead, since the stream may now hold
/// a partial batch. A failed table accepts nothing further and refuses to
/// close, so no index is ever written over a corrupt batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableState {
    Open,
    /// A close is in progress
    Closing,
    Closed,
    Failed,
}

/// Appends rows to a table in fixed-size, zstd compressed batches
///
/// All offsets recorded in the batch index come from the stream's
/// [`Tell`] and are therefore relative to the start of the table, even when
/// the stream is a view into a larger file.
pub struct TableWriter<W: Write + Tell> {
    inner: W,
    kind: TableKind,
    state: TableState,

    /// Number of rows per batch
    batch_size: usize,
    /// Rows encoded in `ubuf` but not yet written
    pending_rows: usize,
    /// Total rows appended, including pending rows
    rows_written: u64,
    /// Rows of all batches already written
    rows_flushed: u64,

    /// Uncompressed row bytes of the pending batch
    ubuf: Vec<u8>,
    /// Reusable compression buffer
    zbuf: Vec<u8>,

    /// One entry per batch written
    ranges: Vec<BatchRange>,

    pool: Arc<MemoryPool>,
    cctx: zstd_safe::CCtx<'static>,
}
impl<W: Write + Tell> TableWriter<W> {
    /// Creates the writer and writes the table header and schema metadata
    pub fn new(
        mut inner: W,
        kind: TableKind,
        metadata: &SchemaMetadata,
        batch_size: usize,
        pool: Arc<MemoryPool>,
    ) -> Result<Self> {
        let mut ubuf = pool.allocate(BATCH_BUFFER_CAPACITY);
        let n_metadata = metadata.encode(&mut ubuf)?;
        inner.write_all(TableHeader::new(kind, n_metadata).as_bytes())?;
        inner.write_all(&ubuf)?;
        ubuf.clear();

        debug!(table = kind.name(), batch_size, "table writer opened");

        Ok(Self {
            inner,
            kind,
            state: TableState::Open,
            batch_size: batch_size.max(1),
            pending_rows: 0,
            rows_written: 0,
            rows_flushed: 0,
            ubuf,
            zbuf: pool.allocate(BATCH_BUFFER_CAPACITY),
            ranges: Vec::new(),
            pool,
            cctx: zstd_safe::CCtx::create(),
        })
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// Total rows appended so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Number of batches written so far, dictionary batches included
    pub fn batches_written(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_batch_full(&self) -> bool {
        self.pending_rows >= self.batch_size
    }

    pub fn has_pending_rows(&self) -> bool {
        self.pending_rows > 0
    }

    fn ensure_open(&self) -> Result<()> {
        let table = self.kind.name();
        match self.state {
            TableState::Open => Ok(()),
            TableState::Failed => Err(TableError::Failed { table }.into()),
            TableState::Closing | TableState::Closed => Err(TableError::Closed { table }.into()),
        }
    }

    /// Marks the table failed if `result` is an error
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(table = self.kind.name(), error = %err, "table write failed");
            self.state = TableState::Failed;
        }
        result
    }

    /// Encodes one row into the pending batch and returns its row index
    ///
    /// The batch is not flushed here; callers decide when via
    /// [`is_batch_full`](Self::is_batch_full) so that they can write
    /// dependent batches first.
    pub fn push<R: TableRow + ?Sized>(&mut self, row: &R) -> Result<u64> {
        self.ensure_open()?;

        let start = self.ubuf.len();
        if let Err(err) = row.encode(&mut self.ubuf) {
            // drop the partially encoded row
            self.ubuf.truncate(start);
            return Err(err);
        }

        let index = self.rows_written;
        self.pending_rows += 1;
        self.rows_written += 1;
        Ok(index)
    }

    /// Writes the pending rows as one batch
    pub fn flush_batch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.write_pending()
    }

    /// Writes `rows` as a dictionary batch tagged with `dictionary`
    pub fn write_dictionary_batch<R: TableRow>(&mut self, dictionary: u8, rows: &[R]) -> Result<()> {
        self.ensure_open()?;
        if rows.is_empty() {
            return Ok(());
        }

        let mut dbuf = self.pool.allocate(BATCH_BUFFER_CAPACITY);
        let result = rows
            .iter()
            .try_for_each(|row| row.encode(&mut dbuf))
            .and_then(|()| {
                self.write_batch(BATCH_DICTIONARY, dictionary, rows.len() as u64, &dbuf)
            });
        self.pool.release(dbuf);
        result
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending_rows == 0 {
            return Ok(());
        }
        let ubuf = std::mem::take(&mut self.ubuf);
        let result = self.write_batch(BATCH_ROWS, 0, self.pending_rows as u64, &ubuf);
        self.ubuf = ubuf;
        result?;

        self.rows_flushed += self.pending_rows as u64;
        self.pending_rows = 0;
        self.ubuf.clear();
        Ok(())
    }

    fn write_batch(&mut self, content: u8, dictionary: u8, num_rows: u64, rows: &[u8]) -> Result<()> {
        let result = self.try_write_batch(content, dictionary, num_rows, rows);
        self.track(result)
    }

    fn try_write_batch(
        &mut self,
        content: u8,
        dictionary: u8,
        num_rows: u64,
        rows: &[u8],
    ) -> Result<()> {
        let offset = self.inner.tell()?;
        sized_compress(&mut self.zbuf, rows, DEFAULT_COMPRESSION_LEVEL, &mut self.cctx)?;

        let header = BatchHeader::new(
            content,
            dictionary,
            num_rows,
            rows.len() as u64,
            self.zbuf.len() as u64,
        );
        header.write(&mut self.inner)?;
        self.inner.write_all(&self.zbuf)?;

        let cumulative_rows = if content == BATCH_ROWS {
            self.rows_flushed + num_rows
        } else {
            self.rows_flushed
        };
        self.ranges
            .push(BatchRange::new(offset, cumulative_rows, content, dictionary));

        debug!(
            table = self.kind.name(),
            content,
            dictionary,
            rows = num_rows,
            u_bytes = rows.len(),
            z_bytes = self.zbuf.len(),
            "batch written"
        );
        Ok(())
    }

    fn write_index(&mut self) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(&self.ranges);
        let mut z_index = Vec::default();
        copy_encode(bytes, &mut z_index, 0)?;

        let header = IndexHeader::new(bytes.len() as u64, z_index.len() as u64);
        let footer = IndexFooter::new(z_index.len() as u64);
        self.inner.write_all(header.as_bytes())?;
        self.inner.write_all(&z_index)?;
        self.inner.write_all(footer.as_bytes())?;
        Ok(())
    }

    /// Flushes the final batch, writes the batch index, and flushes the stream
    ///
    /// Closing a closed table is a no-op. A table whose stream failed earlier
    /// cannot be closed. The underlying stream is flushed but never closed;
    /// that belongs to whoever owns the stream.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            TableState::Closed => return Ok(()),
            TableState::Closing | TableState::Failed => {
                return Err(TableError::CloseFailed {
                    table: self.kind.name(),
                }
                .into());
            }
            TableState::Open => self.state = TableState::Closing,
        }

        self.write_pending()?;
        let result = self.write_index().and_then(|()| Ok(self.inner.flush()?));
        self.track(result)?;

        self.pool.release(std::mem::take(&mut self.ubuf));
        self.pool.release(std::mem::take(&mut self.zbuf));
        self.state = TableState::Closed;

        debug!(
            table = self.kind.name(),
            rows = self.rows_written,
            batches = self.ranges.len(),
            "table writer closed"
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Returns the underlying stream
    pub fn into_inner(self) -> W {
        self.inner
    }
}
