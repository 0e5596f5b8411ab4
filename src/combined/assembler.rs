use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::FORMAT_VERSION;
use crate::error::{CombinedError, Result, WriteError};
use crate::pool::MemoryPool;
use crate::stream::{FileOutputStream, SharedOutputStream, SubFileOutputStream, Tell};

use super::{
    FileInfo, FooterFields, READS_TMP_SUFFIX, SECTION_ALIGNMENT, SPLICE_CHUNK_SIZE,
    pad_to_alignment, write_combined_header, write_footer, write_section_marker,
};

/// Returns the hidden sibling path `.<basename>.tmp-reads` of `path`
pub(crate) fn reads_tmp_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| WriteError::InvalidPath(path.to_path_buf()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(READS_TMP_SUFFIX);
    Ok(path.with_file_name(tmp_name))
}

/// Everything a combined-mode writer needs to assemble its final file
pub(crate) struct CombinedState {
    path: PathBuf,
    reads_tmp_path: PathBuf,
    section_marker: Uuid,
    file_identifier: Uuid,
    /// Absolute offset of the signal table's first byte
    signal_table_start: u64,
    main: SharedOutputStream,
}
impl CombinedState {
    /// Creates the combined file and writes its header
    ///
    /// The file must not exist yet. The signal table is written next through
    /// [`signal_stream`](Self::signal_stream).
    pub(crate) fn create(path: &Path, section_marker: Uuid, file_identifier: Uuid) -> Result<Self> {
        let reads_tmp_path = reads_tmp_path(path)?;

        let mut main = FileOutputStream::create_new(path)?;
        write_combined_header(&mut main, &section_marker, &file_identifier, FORMAT_VERSION)?;
        let signal_table_start = main.tell()?;

        Ok(Self {
            path: path.to_path_buf(),
            reads_tmp_path,
            section_marker,
            file_identifier,
            signal_table_start,
            main: main.into_shared(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn reads_tmp_path(&self) -> &Path {
        &self.reads_tmp_path
    }

    /// A view of the main stream positioned where the signal table starts
    pub(crate) fn signal_stream(&self) -> Result<SubFileOutputStream> {
        Ok(SubFileOutputStream::new(&self.main)?)
    }

    /// Splices the reads file into the main file and writes the footer
    ///
    /// Both tables must already be closed and the reads file's stream closed.
    /// The temporary reads file is removed once its bytes are copied.
    pub(crate) fn assemble(&self, writing_software: &str, pool: &MemoryPool) -> Result<()> {
        self.main.borrow_mut().close()?;

        let mut out = FileOutputStream::open_append(&self.path)?;
        let signal_table = FileInfo::new(
            self.signal_table_start,
            out.tell()? - self.signal_table_start,
        );
        pad_to_alignment(&mut out, SECTION_ALIGNMENT)?;
        write_section_marker(&mut out, &self.section_marker)?;

        let read_table_start = out.tell()?;
        let copied = splice(&self.reads_tmp_path, &mut out, pool)?;
        let read_table = FileInfo::new(read_table_start, copied);
        debug!(
            from = %self.reads_tmp_path.display(),
            bytes = copied,
            "read table spliced"
        );

        remove_reads_tmp(&self.reads_tmp_path)?;

        pad_to_alignment(&mut out, SECTION_ALIGNMENT)?;
        write_section_marker(&mut out, &self.section_marker)?;
        let fields = FooterFields {
            file_identifier: *self.file_identifier.as_bytes(),
            version: FORMAT_VERSION,
            signal_table,
            read_table,
        };
        write_footer(&mut out, &self.section_marker, &fields, writing_software)?;
        let file_size = out.tell()?;
        out.close()?;

        info!(
            path = %self.path.display(),
            file_size,
            signal_offset = signal_table.file_start_offset,
            signal_length = signal_table.file_length,
            read_offset = read_table.file_start_offset,
            read_length = read_table.file_length,
            "combined file assembled"
        );
        Ok(())
    }
}

/// Deletes the spliced temporary reads file
fn remove_reads_tmp(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|source| {
        CombinedError::TempFileRemoval {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Appends the whole of the file at `src` to `dst` in fixed-size blocks
fn splice<W: Write>(src: &Path, dst: &mut W, pool: &MemoryPool) -> Result<u64> {
    let mut file = File::open(src)?;
    let mut buffer = pool.allocate(SPLICE_CHUNK_SIZE);
    buffer.resize(SPLICE_CHUNK_SIZE, 0);
    let result = copy_blocks(&mut file, dst, &mut buffer);
    pool.release(buffer);
    result
}

fn copy_blocks<R: Read, W: Write>(src: &mut R, dst: &mut W, buffer: &mut [u8]) -> Result<u64> {
    let mut copied = 0u64;
    loop {
        let n = match src.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        dst.write_all(&buffer[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}
