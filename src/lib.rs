//! # pod5-writer
//!
//! Writes nanopore signal container files: per-read metadata, raw or
//! compressed signal split into fixed-size chunks, and the deduplicated
//! dictionaries the reads reference.
//!
//! Files come in two layouts:
//!
//! - **Split**: a signal file and a reads file, see [`create_split_file`]
//! - **Combined**: one file with both tables framed by section markers and
//!   located through a footer, see [`create_combined_file`]
//!
//! ```no_run
//! use pod5_writer::{FileWriterOptions, SignalType, create_combined_file};
//!
//! # fn main() -> pod5_writer::Result<()> {
//! let options = FileWriterOptions::default()
//!     .max_signal_chunk_size(20_000)
//!     .signal_type(SignalType::Vbz);
//! let mut writer = create_combined_file("reads.pod5", "my-tool", &options)?;
//! // ... add dictionaries and reads
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

pub mod combined;
mod core;
pub mod dictionary;
pub mod error;
mod ids;
mod options;
mod pool;
mod read_table;
pub mod signal;
pub mod stream;
pub mod table;
mod writer;

pub use core::{
    CalibrationData, CalibrationDictionaryIndex, DictionaryIndex, EndReason, EndReasonData,
    EndReasonDictionaryIndex, FORMAT_VERSION, KeyValueList, PoreData, PoreDictionaryIndex,
    ReadData, ReadTableRowIndex, RunInfoData, RunInfoDictionaryIndex, SignalTableRowIndex, Version,
};
pub use error::{Error, Result};
pub use ids::{ID_SEED, IdGenerator, RandomIdGenerator};
pub use options::{
    DEFAULT_READ_TABLE_BATCH_SIZE, DEFAULT_SIGNAL_CHUNK_SIZE, DEFAULT_SIGNAL_TABLE_BATCH_SIZE,
    FileWriterOptions, SignalType,
};
pub use pool::MemoryPool;
pub use read_table::ReadTableWriter;
pub use writer::{
    FileWriter, create_combined_file, create_combined_file_with_generator, create_split_file,
    create_split_file_with_generator,
};
