//! Output streams used by the table writers
//!
//! A [`FileOutputStream`] is the only stream type that can be closed. In
//! combined mode it is shared through a [`SharedOutputStream`] handle and the
//! signal table writes into it through a [`SubFileOutputStream`], which
//! reports positions relative to the byte where the signal table begins. The
//! sub-stream has no close operation: the main stream is closed exactly once
//! by the file writer that owns it.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use auto_impl::auto_impl;

/// Buffer capacity of file backed streams
const STREAM_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Streams that can report the number of bytes written since their logical start
#[auto_impl(&, &mut, Box)]
pub trait Tell {
    fn tell(&self) -> io::Result<u64>;
}

/// A buffered, position-tracking file output stream
pub struct FileOutputStream {
    path: PathBuf,
    /// `None` once closed
    inner: Option<BufWriter<File>>,
    position: u64,
}
impl FileOutputStream {
    /// Creates a new file, failing if anything already exists at `path`
    pub fn create_new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        Ok(Self::from_file(path.as_ref(), file, 0))
    }

    /// Creates or truncates the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::from_file(path.as_ref(), file, 0))
    }

    /// Opens an existing file for appending, positioned at its current end
    pub fn open_append<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().append(true).open(path.as_ref())?;
        let position = file.metadata()?.len();
        Ok(Self::from_file(path.as_ref(), file, position))
    }

    fn from_file(path: &Path, file: File, position: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: Some(BufWriter::with_capacity(STREAM_BUFFER_CAPACITY, file)),
            position,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Flushes buffered bytes, syncs them to storage, and releases the file
    ///
    /// Closing an already closed stream is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(writer) = self.inner.take() {
            let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
            file.sync_all()?;
        }
        Ok(())
    }

    /// Wraps the stream in a shared handle for sub-stream views
    #[must_use]
    pub fn into_shared(self) -> SharedOutputStream {
        Rc::new(RefCell::new(self))
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.inner.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("stream for '{}' is closed", self.path.display()),
            )
        })
    }
}
impl Write for FileOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer()?.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}
impl Tell for FileOutputStream {
    fn tell(&self) -> io::Result<u64> {
        Ok(self.position)
    }
}

/// Shared handle to the main output stream of a combined file
pub type SharedOutputStream = Rc<RefCell<FileOutputStream>>;

/// A view over a shared stream starting at a fixed offset
///
/// Writes and flushes go straight to the underlying stream while
/// [`Tell::tell`] reports positions relative to `offset`, so a table writer
/// can treat the view as a file of its own.
pub struct SubFileOutputStream {
    main: SharedOutputStream,
    offset: u64,
}
impl SubFileOutputStream {
    /// Creates a view starting at the current position of `main`
    pub fn new(main: &SharedOutputStream) -> io::Result<Self> {
        let offset = main.borrow().tell()?;
        Ok(Self {
            main: Rc::clone(main),
            offset,
        })
    }

    /// Offset of this view within the underlying stream
    pub fn offset(&self) -> u64 {
        self.offset
    }
}
impl Write for SubFileOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.main.borrow_mut().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.main.borrow_mut().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.main.borrow_mut().flush()
    }
}
impl Tell for SubFileOutputStream {
    fn tell(&self) -> io::Result<u64> {
        let position = self.main.borrow().tell()?;
        position.checked_sub(self.offset).ok_or_else(|| {
            io::Error::other(format!(
                "stream position {position} is before sub-stream offset {}",
                self.offset
            ))
        })
    }
}

/// The stream a signal table writes to in either layout
pub enum SignalStream {
    /// A file of its own (split layout)
    Standalone(FileOutputStream),
    /// A region of the main combined file
    Embedded(SubFileOutputStream),
}
impl Write for SignalStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Standalone(stream) => stream.write(buf),
            Self::Embedded(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Standalone(stream) => stream.flush(),
            Self::Embedded(stream) => stream.flush(),
        }
    }
}
impl Tell for SignalStream {
    fn tell(&self) -> io::Result<u64> {
        match self {
            Self::Standalone(stream) => stream.tell(),
            Self::Embedded(stream) => stream.tell(),
        }
    }
}

/// In-memory streams report their length as position
impl Tell for Vec<u8> {
    fn tell(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}
