//! # File writer
//!
//! [`FileWriter`] is the entry point for producing files. It owns the four
//! dictionaries and both table writers, splits raw signal into chunks, and on
//! close finalizes whichever layout it was created for.
//!
//! ## Split layout
//!
//! Two independent files, one holding the signal table and one holding the
//! read table. Each table carries the same file identifier in its schema
//! metadata.
//!
//! ## Combined layout
//!
//! One file holding both tables (see [`combined`](crate::combined)). The
//! signal table is written in place right after the header; the read table is
//! built in a hidden temporary file next to the target and spliced in on
//! close.
//!
//! ## Example
//!
//! ```no_run
//! use pod5_writer::{
//!     CalibrationData, EndReasonData, FileWriterOptions, PoreData, ReadData, RunInfoData,
//!     create_combined_file,
//! };
//! use uuid::Uuid;
//!
//! # fn main() -> pod5_writer::Result<()> {
//! let mut writer = create_combined_file("run.pod5", "my-basecaller", &FileWriterOptions::default())?;
//!
//! let read = ReadData {
//!     read_id: Uuid::from_u128(0x6a2f_3c11),
//!     pore: writer.add_pore(&PoreData::default())?,
//!     calibration: writer.add_calibration(&CalibrationData::new(0.0, 1.0))?,
//!     read_number: 1,
//!     start_sample: 0,
//!     median_before: 200.0,
//!     end_reason: writer.add_end_reason(&EndReasonData::default())?,
//!     run_info: writer.add_run_info(&RunInfoData::default())?,
//! };
//! writer.add_complete_read(&read, &[512; 4000])?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::combined::CombinedState;
use crate::core::{
    CalibrationData, CalibrationDictionaryIndex, EndReasonData, EndReasonDictionaryIndex,
    FORMAT_VERSION, PoreData, PoreDictionaryIndex, ReadData, ReadTableRowIndex, RunInfoData,
    RunInfoDictionaryIndex, SignalTableRowIndex,
};
use crate::dictionary::DictionaryWriters;
use crate::error::{Result, WriteError};
use crate::ids::{IdGenerator, RandomIdGenerator};
use crate::options::FileWriterOptions;
use crate::pool::MemoryPool;
use crate::read_table::ReadTableWriter;
use crate::signal::SignalTableWriter;
use crate::stream::{FileOutputStream, SignalStream};
use crate::table::SchemaMetadata;

/// Both table writers; they exist together or not at all
struct TableWriters {
    signal: SignalTableWriter<SignalStream>,
    read: ReadTableWriter<FileOutputStream>,
}

/// Layout specific state of a writer
enum WriterKind {
    Split,
    Combined(CombinedState),
}

/// Writes reads, their signal, and the dictionaries they reference
///
/// Created by [`create_split_file`] or [`create_combined_file`]. All writes
/// fail with [`WriteError::WriterClosed`] once [`close`](Self::close) has been
/// called. A writer dropped without being closed is closed on drop, and a
/// failure there is logged rather than raised.
pub struct FileWriter {
    kind: WriterKind,
    /// `None` once the writer is closed
    tables: Option<TableWriters>,
    dictionaries: DictionaryWriters,

    file_identifier: Uuid,
    writing_software: String,
    max_signal_chunk_size: u32,
    pool: Arc<MemoryPool>,

    signal_rows_written: u64,
    reads_written: u64,
}
impl FileWriter {
    fn new(
        kind: WriterKind,
        tables: TableWriters,
        file_identifier: Uuid,
        writing_software: &str,
        options: &FileWriterOptions,
        pool: Arc<MemoryPool>,
    ) -> Self {
        Self {
            kind,
            tables: Some(tables),
            dictionaries: DictionaryWriters::new(),
            file_identifier,
            writing_software: writing_software.to_string(),
            max_signal_chunk_size: options.get_max_signal_chunk_size(),
            pool,
            signal_rows_written: 0,
            reads_written: 0,
        }
    }

    /// Path of the temporary reads file, combined layout only
    pub fn reads_tmp_path(&self) -> Option<&Path> {
        match &self.kind {
            WriterKind::Split => None,
            WriterKind::Combined(state) => Some(state.reads_tmp_path()),
        }
    }

    /// Identifier shared by every table of this file
    pub fn file_identifier(&self) -> Uuid {
        self.file_identifier
    }

    pub fn writing_software(&self) -> &str {
        &self.writing_software
    }

    pub fn signal_rows_written(&self) -> u64 {
        self.signal_rows_written
    }

    pub fn reads_written(&self) -> u64 {
        self.reads_written
    }

    pub fn is_closed(&self) -> bool {
        self.tables.is_none()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(WriteError::WriterClosed.into())
        } else {
            Ok(())
        }
    }

    fn tables_mut(&mut self) -> Result<&mut TableWriters> {
        self.tables
            .as_mut()
            .ok_or_else(|| WriteError::WriterClosed.into())
    }

    pub fn add_pore(&mut self, pore: &PoreData) -> Result<PoreDictionaryIndex> {
        self.ensure_open()?;
        self.dictionaries.pore.add(pore)
    }

    pub fn add_calibration(
        &mut self,
        calibration: &CalibrationData,
    ) -> Result<CalibrationDictionaryIndex> {
        self.ensure_open()?;
        self.dictionaries.calibration.add(calibration)
    }

    pub fn add_end_reason(&mut self, end_reason: &EndReasonData) -> Result<EndReasonDictionaryIndex> {
        self.ensure_open()?;
        self.dictionaries.end_reason.add(end_reason)
    }

    pub fn add_run_info(&mut self, run_info: &RunInfoData) -> Result<RunInfoDictionaryIndex> {
        self.ensure_open()?;
        self.dictionaries.run_info.add(run_info)
    }

    /// Writes a read and its raw signal
    ///
    /// The signal is split into consecutive chunks of at most
    /// `max_signal_chunk_size` samples, each stored as one signal row. The
    /// read row references those rows in order. An empty signal produces no
    /// signal rows and an empty manifest.
    pub fn add_complete_read(
        &mut self,
        read_data: &ReadData,
        signal: &[i16],
    ) -> Result<ReadTableRowIndex> {
        let chunk_size = self.max_signal_chunk_size as usize;
        let Some(tables) = self.tables.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        // reject bad dictionary references before any signal is written
        self.dictionaries.check_read(read_data)?;

        let mut signal_rows = Vec::with_capacity(signal.len().div_ceil(chunk_size));
        for chunk in signal.chunks(chunk_size) {
            signal_rows.push(tables.signal.add_signal(&read_data.read_id, chunk)?);
            self.signal_rows_written += 1;
        }

        let index = tables
            .read
            .add_read(read_data, &signal_rows, &mut self.dictionaries)?;
        self.reads_written += 1;
        Ok(index)
    }

    /// Writes a read referencing signal rows that were already written
    ///
    /// Used together with [`add_pre_compressed_signal`](Self::add_pre_compressed_signal).
    /// The row indices are stored as given.
    pub fn add_complete_read_with_signal_rows(
        &mut self,
        read_data: &ReadData,
        signal_rows: &[SignalTableRowIndex],
    ) -> Result<ReadTableRowIndex> {
        let Some(tables) = self.tables.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        let index = tables
            .read
            .add_read(read_data, signal_rows, &mut self.dictionaries)?;
        self.reads_written += 1;
        Ok(index)
    }

    /// Writes one signal row from already compressed bytes
    ///
    /// `sample_count` is stored as given and not checked against the data.
    pub fn add_pre_compressed_signal(
        &mut self,
        read_id: &Uuid,
        signal_bytes: &[u8],
        sample_count: u32,
    ) -> Result<SignalTableRowIndex> {
        let index = self
            .tables_mut()?
            .signal
            .add_pre_compressed_signal(read_id, signal_bytes, sample_count)?;
        self.signal_rows_written += 1;
        Ok(index)
    }

    /// Flushes both tables and finalizes the file
    ///
    /// The read table is closed first, then the signal table. In combined
    /// mode the read table is then spliced into the main file and the footer
    /// written. The writer counts as closed from the moment this is called:
    /// if any step fails the file is incomplete and later calls to `close`
    /// return `Ok` without retrying.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut tables) = self.tables.take() else {
            return Ok(());
        };

        tables.read.close(&mut self.dictionaries)?;
        tables.read.into_inner().close()?;

        tables.signal.close()?;
        match tables.signal.into_inner() {
            SignalStream::Standalone(mut stream) => stream.close()?,
            // the main stream is closed by the assembler
            SignalStream::Embedded(_) => {}
        }

        if let WriterKind::Combined(state) = &self.kind {
            state.assemble(&self.writing_software, &self.pool)?;
        }

        info!(
            file_identifier = %self.file_identifier,
            reads = self.reads_written,
            signal_rows = self.signal_rows_written,
            "file writer closed"
        );
        Ok(())
    }
}
impl Drop for FileWriter {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(err) = self.close() {
            let path = match &self.kind {
                WriterKind::Split => None,
                WriterKind::Combined(state) => Some(state.path().to_path_buf()),
            };
            warn!(
                file_identifier = %self.file_identifier,
                path = ?path,
                error = %err,
                "failed to close file writer on drop, output is incomplete"
            );
        }
    }
}

fn ensure_absent(path: &Path) -> Result<()> {
    if path.try_exists()? {
        Err(WriteError::PathExists(path.to_path_buf()).into())
    } else {
        Ok(())
    }
}

/// Creates a writer producing separate signal and read files
///
/// Fails without touching either path if anything already exists at one of
/// them, or if both name the same file.
pub fn create_split_file<P: AsRef<Path>, Q: AsRef<Path>>(
    signal_path: P,
    reads_path: Q,
    writing_software: &str,
    options: &FileWriterOptions,
) -> Result<FileWriter> {
    create_split_file_with_generator(
        signal_path,
        reads_path,
        writing_software,
        options,
        &mut RandomIdGenerator::new(),
    )
}

/// [`create_split_file`] drawing the file identifier from `ids`
pub fn create_split_file_with_generator<P: AsRef<Path>, Q: AsRef<Path>, G: IdGenerator>(
    signal_path: P,
    reads_path: Q,
    writing_software: &str,
    options: &FileWriterOptions,
    ids: &mut G,
) -> Result<FileWriter> {
    let pool = options.validate()?;
    let (signal_path, reads_path) = (signal_path.as_ref(), reads_path.as_ref());
    if signal_path == reads_path {
        return Err(WriteError::DuplicatePath(signal_path.to_path_buf()).into());
    }
    ensure_absent(signal_path)?;
    ensure_absent(reads_path)?;

    let file_identifier = ids.next_id();
    let metadata = SchemaMetadata::new(file_identifier, writing_software, FORMAT_VERSION);

    let signal = SignalTableWriter::new(
        SignalStream::Standalone(FileOutputStream::create_new(signal_path)?),
        &metadata,
        options.get_signal_table_batch_size(),
        options.get_signal_type(),
        Arc::clone(&pool),
    )?;
    let read = ReadTableWriter::new(
        FileOutputStream::create_new(reads_path)?,
        &metadata,
        options.get_read_table_batch_size(),
        Arc::clone(&pool),
    )?;

    info!(
        signal_path = %signal_path.display(),
        reads_path = %reads_path.display(),
        %file_identifier,
        "created split file writer"
    );
    Ok(FileWriter::new(
        WriterKind::Split,
        TableWriters { signal, read },
        file_identifier,
        writing_software,
        options,
        pool,
    ))
}

/// Creates a writer producing a single combined file
///
/// The read table is staged in `.<basename>.tmp-reads` next to `path` until
/// [`FileWriter::close`] splices it in. Fails without touching `path` if
/// anything already exists there.
pub fn create_combined_file<P: AsRef<Path>>(
    path: P,
    writing_software: &str,
    options: &FileWriterOptions,
) -> Result<FileWriter> {
    create_combined_file_with_generator(
        path,
        writing_software,
        options,
        &mut RandomIdGenerator::new(),
    )
}

/// [`create_combined_file`] drawing the section marker, then the file identifier, from `ids`
pub fn create_combined_file_with_generator<P: AsRef<Path>, G: IdGenerator>(
    path: P,
    writing_software: &str,
    options: &FileWriterOptions,
    ids: &mut G,
) -> Result<FileWriter> {
    let pool = options.validate()?;
    let path = path.as_ref();
    ensure_absent(path)?;

    let section_marker = ids.next_id();
    let file_identifier = ids.next_id();
    let metadata = SchemaMetadata::new(file_identifier, writing_software, FORMAT_VERSION);

    let state = CombinedState::create(path, section_marker, file_identifier)?;
    let signal = SignalTableWriter::new(
        SignalStream::Embedded(state.signal_stream()?),
        &metadata,
        options.get_signal_table_batch_size(),
        options.get_signal_type(),
        Arc::clone(&pool),
    )?;
    let read = ReadTableWriter::new(
        FileOutputStream::create(state.reads_tmp_path())?,
        &metadata,
        options.get_read_table_batch_size(),
        Arc::clone(&pool),
    )?;

    debug!(reads_tmp_path = %state.reads_tmp_path().display(), "staging read table");
    info!(
        path = %path.display(),
        %file_identifier,
        "created combined file writer"
    );
    Ok(FileWriter::new(
        WriterKind::Combined(state),
        TableWriters { signal, read },
        file_identifier,
        writing_software,
        options,
        pool,
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::combined::{FileInfo, Footer, SECTION_MARKER_SIZE};
    use crate::error::{CombinedError, ConfigError, Error, TableError};
    use crate::ids::ID_SEED;
    use crate::options::SignalType;
    use crate::signal::{compress_signal, decompress_signal};
    use crate::table::KEY_FILE_IDENTIFIER;
    use crate::table::testing::{ParsedTable, read_rows, signal_rows};

    fn options(chunk_size: u32) -> FileWriterOptions {
        FileWriterOptions::default()
            .max_signal_chunk_size(chunk_size)
            .memory_pool(Some(Arc::new(MemoryPool::new())))
    }

    fn read_data(writer: &mut FileWriter, n: u128) -> Result<ReadData> {
        Ok(ReadData {
            read_id: Uuid::from_u128(n),
            pore: writer.add_pore(&PoreData {
                channel: 12,
                well: 1,
                pore_type: "r10.4.1".to_string(),
            })?,
            calibration: writer.add_calibration(&CalibrationData::new(-240.0, 0.18))?,
            read_number: n as u32,
            start_sample: 4000 * n as u64,
            median_before: 210.5,
            end_reason: writer.add_end_reason(&EndReasonData::default())?,
            run_info: writer.add_run_info(&RunInfoData::default())?,
        })
    }

    fn samples(len: usize) -> Vec<i16> {
        (0..len).map(|i| (i % 1000) as i16 - 500).collect()
    }

    fn table_bytes(bytes: &[u8], info: FileInfo) -> &[u8] {
        let start = info.file_start_offset as usize;
        &bytes[start..start + info.file_length as usize]
    }

    /// Footer, signal table, and read table of a closed combined file
    fn parse_combined(path: &Path) -> Result<(Footer, ParsedTable, ParsedTable)> {
        let bytes = fs::read(path)?;
        let footer = Footer::read_from(&mut Cursor::new(&bytes))?;
        let signal = ParsedTable::parse(table_bytes(&bytes, footer.signal_table))?;
        let reads = ParsedTable::parse(table_bytes(&bytes, footer.read_table))?;
        Ok((footer, signal, reads))
    }

    fn combined_path(dir: &TempDir) -> PathBuf {
        dir.path().join("out.pod5")
    }

    #[test]
    fn test_end_to_end_combined() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "e2e-test", &options(10_000))?;
        let tmp_path = writer.reads_tmp_path().map(Path::to_path_buf);
        assert_eq!(tmp_path, Some(dir.path().join(".out.pod5.tmp-reads")));

        let read = read_data(&mut writer, 1)?;
        assert_eq!(
            (read.pore, read.calibration, read.end_reason, read.run_info),
            (0, 0, 0, 0)
        );
        let signal = samples(30_000);
        assert_eq!(writer.add_complete_read(&read, &signal)?, 0);
        assert_eq!(writer.signal_rows_written(), 3);
        assert_eq!(writer.reads_written(), 1);

        let file_identifier = writer.file_identifier();
        writer.close()?;
        assert!(writer.is_closed());
        assert!(!dir.path().join(".out.pod5.tmp-reads").exists());

        let (footer, signal_table, read_table) = parse_combined(&path)?;
        assert_eq!(footer.file_identifier, file_identifier);
        assert_eq!(footer.writing_software, "e2e-test");

        let rows = signal_rows(&signal_table)?;
        assert_eq!(
            rows.iter().map(|row| row.1).collect::<Vec<_>>(),
            [10_000, 10_000, 10_000]
        );
        let mut decoded = Vec::new();
        for (id, count, payload) in &rows {
            assert_eq!(*id, read.read_id);
            decoded.extend(decompress_signal(payload, *count)?);
        }
        assert_eq!(decoded, signal);

        assert_eq!(read_rows(&read_table)?, [(read.read_id, 1, vec![0, 1, 2])]);

        let identifier = file_identifier.hyphenated().to_string();
        for table in [&signal_table, &read_table] {
            assert!(table
                .metadata
                .contains(&(KEY_FILE_IDENTIFIER.to_string(), identifier.clone())));
        }
        Ok(())
    }

    #[test]
    fn test_footer_ranges_are_consistent() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "ranges", &options(333))?;
        for n in 0..25 {
            let read = read_data(&mut writer, n)?;
            writer.add_complete_read(&read, &samples(100 * n as usize + 7))?;
        }
        writer.close()?;

        let file_size = fs::metadata(&path)?.len() as i64;
        let (footer, _, _) = parse_combined(&path)?;
        let (signal, read) = (footer.signal_table, footer.read_table);

        assert_eq!(signal.file_start_offset, 64);
        let gap = read.file_start_offset - signal.end_offset();
        let marker = SECTION_MARKER_SIZE as i64;
        assert!((marker..marker + 8).contains(&gap));
        assert_eq!(read.file_start_offset % 8, 0);
        assert!(read.end_offset() + marker <= file_size);
        assert_eq!(file_size % 8, 0);
        Ok(())
    }

    #[test]
    fn test_chunk_boundaries() -> Result<()> {
        let dir = TempDir::new()?;
        let signal_path = dir.path().join("signal.pod5");
        let reads_path = dir.path().join("reads.pod5");
        let mut writer = create_split_file(&signal_path, &reads_path, "chunks", &options(7))?;

        for (n, len) in [0usize, 6, 7, 8, 21].into_iter().enumerate() {
            let read = read_data(&mut writer, n as u128)?;
            writer.add_complete_read(&read, &samples(len))?;
        }
        writer.close()?;

        let signal = signal_rows(&ParsedTable::parse(&fs::read(&signal_path)?)?)?;
        let counts: Vec<u32> = signal.iter().map(|row| row.1).collect();
        assert_eq!(counts, [6, 7, 7, 1, 7, 7, 7]);

        let manifests: Vec<Vec<u64>> = read_rows(&ParsedTable::parse(&fs::read(&reads_path)?)?)?
            .into_iter()
            .map(|read| read.2)
            .collect();
        assert_eq!(
            manifests,
            [vec![], vec![0], vec![1], vec![2, 3], vec![4, 5, 6]]
        );
        Ok(())
    }

    #[test]
    fn test_split_files_share_identifier() -> Result<()> {
        let dir = TempDir::new()?;
        let signal_path = dir.path().join("signal.pod5");
        let reads_path = dir.path().join("reads.pod5");
        let mut writer = create_split_file(&signal_path, &reads_path, "split", &options(100))?;
        assert_eq!(writer.reads_tmp_path(), None);
        let id = writer.file_identifier().hyphenated().to_string();
        writer.close()?;

        for path in [&signal_path, &reads_path] {
            let table = ParsedTable::parse(&fs::read(path)?)?;
            assert!(table
                .metadata
                .contains(&(KEY_FILE_IDENTIFIER.to_string(), id.clone())));
        }
        Ok(())
    }

    #[test]
    fn test_writes_after_close_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "closed", &options(100))?;
        let read = read_data(&mut writer, 1)?;
        writer.close()?;
        let len = fs::metadata(&path)?.len();

        let results = [
            writer.add_pore(&PoreData::default()).map(|_| ()),
            writer
                .add_calibration(&CalibrationData::new(1.0, 1.0))
                .map(|_| ()),
            writer.add_end_reason(&EndReasonData::default()).map(|_| ()),
            writer.add_run_info(&RunInfoData::default()).map(|_| ()),
            writer.add_complete_read(&read, &[1, 2, 3]).map(|_| ()),
            writer
                .add_complete_read_with_signal_rows(&read, &[0])
                .map(|_| ()),
            writer
                .add_pre_compressed_signal(&read.read_id, &[0], 1)
                .map(|_| ()),
        ];
        for result in results {
            let err = result.unwrap_err();
            assert!(matches!(err, Error::WriteError(WriteError::WriterClosed)));
            assert!(err.is_invalid_operation());
        }
        assert_eq!(fs::metadata(&path)?.len(), len);
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "twice", &options(100))?;
        let read = read_data(&mut writer, 1)?;
        writer.add_complete_read(&read, &samples(250))?;
        writer.close()?;
        let first = fs::read(&path)?;

        writer.close()?;
        drop(writer);
        assert_eq!(fs::read(&path)?, first);
        Ok(())
    }

    #[test]
    fn test_existing_paths_untouched() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        fs::write(&path, b"precious")?;

        let err = create_combined_file(&path, "exists", &options(100)).err();
        assert!(matches!(
            err,
            Some(Error::WriteError(WriteError::PathExists(ref p))) if *p == path
        ));
        assert_eq!(fs::read(&path)?, b"precious");
        assert!(!dir.path().join(".out.pod5.tmp-reads").exists());

        let signal_path = dir.path().join("signal.pod5");
        let err = create_split_file(&signal_path, &path, "exists", &options(100)).err();
        assert!(err.is_some_and(|err| err.is_invalid_operation()));
        assert!(!signal_path.exists());
        assert_eq!(fs::read(&path)?, b"precious");
        Ok(())
    }

    #[test]
    fn test_missing_pool_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let options = options(100).memory_pool(None);

        let err = create_combined_file(&path, "no-pool", &options).err();
        assert!(matches!(
            err,
            Some(Error::ConfigError(ConfigError::MissingMemoryPool))
        ));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_empty_signal_has_empty_manifest() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "empty", &options(100))?;
        let read = read_data(&mut writer, 9)?;
        writer.add_complete_read(&read, &[])?;
        assert_eq!(writer.signal_rows_written(), 0);
        writer.close()?;

        let (_, signal, reads) = parse_combined(&path)?;
        assert!(signal_rows(&signal)?.is_empty());
        assert_eq!(read_rows(&reads)?, [(read.read_id, 9, vec![])]);
        Ok(())
    }

    #[test]
    fn test_pre_compressed_bypass() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "bypass", &options(100))?;
        let read = read_data(&mut writer, 3)?;

        let signal = samples(150);
        let first = writer.add_pre_compressed_signal(&read.read_id, &compress_signal(&signal[..100])?, 100)?;
        let second = writer.add_pre_compressed_signal(&read.read_id, &compress_signal(&signal[100..])?, 50)?;
        writer.add_complete_read_with_signal_rows(&read, &[first, second])?;
        writer.close()?;

        let (_, signal_table, reads) = parse_combined(&path)?;
        let rows = signal_rows(&signal_table)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(decompress_signal(&rows[1].2, rows[1].1)?, &signal[100..]);
        assert_eq!(read_rows(&reads)?[0].2, [0, 1]);
        Ok(())
    }

    #[test]
    fn test_uncompressed_rejects_pre_compressed() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let options = options(100).signal_type(SignalType::Uncompressed);
        let mut writer = create_combined_file(&path, "raw", &options)?;

        let err = writer
            .add_pre_compressed_signal(&Uuid::from_u128(1), &[1, 2], 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::PreCompressedSignalUnsupported)
        ));

        let read = read_data(&mut writer, 1)?;
        writer.add_complete_read(&read, &[5, -5])?;
        writer.close()?;

        let (_, signal, _) = parse_combined(&path)?;
        assert_eq!(signal_rows(&signal)?[0].2, [5, 0, 0xFB, 0xFF]);
        Ok(())
    }

    #[test]
    fn test_unknown_dictionary_index_writes_no_signal() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let mut writer = create_combined_file(&path, "unknown", &options(100))?;
        let mut read = read_data(&mut writer, 1)?;
        read.end_reason = 3;

        let err = writer.add_complete_read(&read, &samples(500)).unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::UnknownDictionaryIndex { .. })
        ));
        assert_eq!(writer.signal_rows_written(), 0);
        assert_eq!(writer.reads_written(), 0);
        writer.close()?;
        Ok(())
    }

    #[test]
    fn test_seeded_output_is_reproducible() -> Result<()> {
        let dir = TempDir::new()?;
        let mut outputs = Vec::new();
        for name in ["a.pod5", "b.pod5"] {
            let path = dir.path().join(name);
            let mut ids = RandomIdGenerator::seeded(ID_SEED);
            let mut writer =
                create_combined_file_with_generator(&path, "seeded", &options(64), &mut ids)?;
            for n in 0..4 {
                let read = read_data(&mut writer, n)?;
                writer.add_complete_read(&read, &samples(200))?;
            }
            writer.close()?;
            outputs.push(fs::read(&path)?);
        }
        assert_eq!(outputs[0], outputs[1]);
        Ok(())
    }

    #[test]
    fn test_drop_finalizes_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        {
            let mut writer = create_combined_file(&path, "dropped", &options(100))?;
            let read = read_data(&mut writer, 1)?;
            writer.add_complete_read(&read, &samples(10))?;
        }
        let (footer, _, reads) = parse_combined(&path)?;
        assert_eq!(footer.writing_software, "dropped");
        assert_eq!(read_rows(&reads)?.len(), 1);
        assert!(!dir.path().join(".out.pod5.tmp-reads").exists());
        Ok(())
    }

    #[test]
    fn test_equal_split_paths_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("both.pod5");

        let err = create_split_file(&path, &path, "same", &options(100)).err();
        assert!(matches!(
            err,
            Some(Error::WriteError(WriteError::DuplicatePath(ref p))) if *p == path
        ));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_section_marker_drawn_first() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);

        let mut expected = RandomIdGenerator::seeded(ID_SEED);
        let marker = expected.next_id();
        let id = expected.next_id();

        let mut ids = RandomIdGenerator::seeded(ID_SEED);
        let mut writer =
            create_combined_file_with_generator(&path, "order", &options(100), &mut ids)?;
        assert_eq!(writer.file_identifier(), id);
        writer.close()?;

        let (footer, _, _) = parse_combined(&path)?;
        assert_eq!(footer.section_marker, marker);
        assert_eq!(footer.file_identifier, id);
        Ok(())
    }

    #[test]
    fn test_failed_read_write_leaves_no_footer() -> Result<()> {
        let dir = TempDir::new()?;
        let path = combined_path(&dir);
        let options = options(100).read_table_batch_size(1);
        let mut writer = create_combined_file(&path, "broken-reads", &options)?;
        let read = read_data(&mut writer, 1)?;

        // every later read table write hits a closed stream
        let tables = writer.tables.as_mut().expect("writer is open");
        tables.read.get_mut().close()?;

        assert!(writer.add_complete_read(&read, &samples(50)).is_err());
        let err = writer.close().unwrap_err();
        assert!(matches!(
            err,
            Error::TableError(TableError::CloseFailed { table: "read" })
        ));
        assert!(writer.is_closed());
        drop(writer);

        let err = Footer::read_from(&mut fs::File::open(&path)?).err();
        assert!(matches!(
            err,
            Some(Error::CombinedError(CombinedError::InvalidSignature))
        ));
        Ok(())
    }

    #[test]
    fn test_failed_signal_write_fails_close() -> Result<()> {
        let dir = TempDir::new()?;
        let signal_path = dir.path().join("signal.pod5");
        let reads_path = dir.path().join("reads.pod5");
        let options = options(100).signal_table_batch_size(1);
        let mut writer = create_split_file(&signal_path, &reads_path, "broken-signal", &options)?;
        let read = read_data(&mut writer, 1)?;

        let tables = writer.tables.as_mut().expect("writer is open");
        if let SignalStream::Standalone(stream) = tables.signal.get_mut() {
            stream.close()?;
        }
        let len = fs::metadata(&signal_path)?.len();

        assert!(writer.add_complete_read(&read, &samples(50)).is_err());
        assert_eq!(writer.reads_written(), 0);
        let err = writer.close().unwrap_err();
        assert!(matches!(
            err,
            Error::TableError(TableError::CloseFailed { table: "signal" })
        ));
        assert_eq!(fs::metadata(&signal_path)?.len(), len);
        Ok(())
    }
}
