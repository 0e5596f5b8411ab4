use std::sync::Arc;

use crate::error::{ConfigError, Result};
use crate::pool::MemoryPool;

/// Default maximum number of samples stored in one signal table row
pub const DEFAULT_SIGNAL_CHUNK_SIZE: u32 = 102_400;

/// Default number of rows per signal table batch
pub const DEFAULT_SIGNAL_TABLE_BATCH_SIZE: usize = 100;

/// Default number of rows per read table batch
pub const DEFAULT_READ_TABLE_BATCH_SIZE: usize = 1000;

/// How samples are stored in the signal table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SignalType {
    /// Little-endian `i16` samples
    Uncompressed = 0,
    /// Delta/zig-zag transformed samples compressed with zstd
    #[default]
    Vbz = 1,
}

/// Configuration for split and combined file writers
///
/// Every setting is independent; unset settings keep their defaults.
///
/// # Examples
///
/// ```rust
/// use pod5_writer::{FileWriterOptions, SignalType};
///
/// let options = FileWriterOptions::default()
///     .max_signal_chunk_size(10_000)
///     .signal_type(SignalType::Uncompressed)
///     .read_table_batch_size(500);
///
/// assert_eq!(options.get_max_signal_chunk_size(), 10_000);
/// ```
#[derive(Debug, Clone)]
pub struct FileWriterOptions {
    max_signal_chunk_size: u32,
    signal_type: SignalType,
    signal_table_batch_size: usize,
    read_table_batch_size: usize,
    memory_pool: Option<Arc<MemoryPool>>,
}
impl Default for FileWriterOptions {
    fn default() -> Self {
        Self {
            max_signal_chunk_size: DEFAULT_SIGNAL_CHUNK_SIZE,
            signal_type: SignalType::default(),
            signal_table_batch_size: DEFAULT_SIGNAL_TABLE_BATCH_SIZE,
            read_table_batch_size: DEFAULT_READ_TABLE_BATCH_SIZE,
            memory_pool: Some(MemoryPool::system()),
        }
    }
}

/// Fluent setters
impl FileWriterOptions {
    /// Sets the maximum number of samples written into a single signal row
    #[must_use]
    pub fn max_signal_chunk_size(mut self, samples: u32) -> Self {
        self.max_signal_chunk_size = samples;
        self
    }

    #[must_use]
    pub fn signal_type(mut self, signal_type: SignalType) -> Self {
        self.signal_type = signal_type;
        self
    }

    #[must_use]
    pub fn signal_table_batch_size(mut self, rows: usize) -> Self {
        self.signal_table_batch_size = rows;
        self
    }

    #[must_use]
    pub fn read_table_batch_size(mut self, rows: usize) -> Self {
        self.read_table_batch_size = rows;
        self
    }

    /// Sets the pool all buffers are drawn from
    ///
    /// Passing `None` is accepted here but rejected when a writer is created.
    #[must_use]
    pub fn memory_pool(mut self, pool: Option<Arc<MemoryPool>>) -> Self {
        self.memory_pool = pool;
        self
    }
}

/// Getters
impl FileWriterOptions {
    #[must_use]
    pub fn get_max_signal_chunk_size(&self) -> u32 {
        self.max_signal_chunk_size
    }

    #[must_use]
    pub fn get_signal_type(&self) -> SignalType {
        self.signal_type
    }

    #[must_use]
    pub fn get_signal_table_batch_size(&self) -> usize {
        self.signal_table_batch_size
    }

    #[must_use]
    pub fn get_read_table_batch_size(&self) -> usize {
        self.read_table_batch_size
    }

    #[must_use]
    pub fn get_memory_pool(&self) -> Option<&Arc<MemoryPool>> {
        self.memory_pool.as_ref()
    }

    /// Checks the options and returns the pool to build the writer with
    pub(crate) fn validate(&self) -> Result<Arc<MemoryPool>> {
        let Some(pool) = self.memory_pool.clone() else {
            return Err(ConfigError::MissingMemoryPool.into());
        };
        if self.max_signal_chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize.into());
        }
        if self.signal_table_batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize { table: "signal" }.into());
        }
        if self.read_table_batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize { table: "read" }.into());
        }
        Ok(pool)
    }
}
