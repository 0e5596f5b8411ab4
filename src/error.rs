use std::path::PathBuf;

/// Custom Result type for pod5 writer operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the writer, encompassing all possible error cases
/// that can occur while building split or combined files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors that occur during write operations
    #[error("Error writing file: {0}")]
    WriteError(#[from] WriteError),

    /// Errors raised by the underlying table writers
    #[error("Error writing table: {0}")]
    TableError(#[from] TableError),

    /// Errors raised while assembling or parsing the combined file framing
    #[error("Error processing combined file: {0}")]
    CombinedError(#[from] CombinedError),

    /// Invalid writer configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),
}
impl Error {
    /// Checks if the error is a precondition/usage failure
    ///
    /// These are reported synchronously at the call site and never leave a
    /// partial write behind: operating on a closed writer or table, creating
    /// a file at an existing path, or supplying an invalid configuration.
    #[must_use]
    pub fn is_invalid_operation(&self) -> bool {
        match self {
            Self::WriteError(err) => matches!(
                err,
                WriteError::WriterClosed | WriteError::PathExists(_) | WriteError::DuplicatePath(_)
            ),
            Self::TableError(err) => matches!(err, TableError::Closed { .. }),
            Self::ConfigError(_) => true,
            _ => false,
        }
    }
}

/// Errors that can occur while writing reads, signal, or dictionary records
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Any write attempted after the file writer was closed
    #[error("File writer closed, cannot write further data")]
    WriterClosed,

    /// Attempted to create a file at a path that already exists
    #[error("Unable to create new file '{}', already exists", .0.display())]
    PathExists(PathBuf),

    /// The signal and reads paths of a split file are the same
    #[error("Signal and reads files cannot share the path '{}'", .0.display())]
    DuplicatePath(PathBuf),

    /// The target path has no file name to derive the temporary reads path from
    #[error("Unable to derive a file name from path '{}'", .0.display())]
    InvalidPath(PathBuf),

    /// A dictionary ran out of index space
    #[error("The {dictionary} dictionary is full ({capacity} entries)")]
    DictionaryFull {
        dictionary: &'static str,
        capacity: usize,
    },

    /// A read referenced a dictionary index that was never handed out
    #[error("Read references {dictionary} index {index} but only {len} entries exist")]
    UnknownDictionaryIndex {
        dictionary: &'static str,
        index: u16,
        len: usize,
    },

    /// Pre-compressed signal can only be stored in a compressed signal table
    #[error("Pre-compressed signal requires a compressed signal table")]
    PreCompressedSignalUnsupported,

    /// A signal chunk or manifest does not fit in its on-disk length field
    #[error("Length {0} exceeds the maximum encodable length")]
    LengthOverflow(usize),
}

/// Errors raised by the batched table writers
#[derive(thiserror::Error, Debug)]
pub enum TableError {
    /// Append or flush on a table that is not open
    #[error("Cannot write to the {table} table, it has been closed")]
    Closed { table: &'static str },

    /// A write to this table's stream failed, the table may hold a partial batch
    #[error("A previous write to the {table} table failed, table is unusable")]
    Failed { table: &'static str },

    /// The table cannot be closed: a previous write or close failed part way
    #[error("Cannot close the {table} table, a previous write or close failed")]
    CloseFailed { table: &'static str },

    /// Invalid table header MAGIC found
    #[error("Invalid table header MAGIC found")]
    InvalidTableHeaderMagic,

    /// Invalid batch header MAGIC found
    #[error("Invalid batch header MAGIC found")]
    InvalidBatchHeaderMagic,

    /// Invalid index header or footer MAGIC found
    #[error("Invalid index MAGIC found")]
    InvalidIndexMagic,
}

/// Errors raised while assembling or inspecting the combined file framing
#[derive(thiserror::Error, Debug)]
pub enum CombinedError {
    /// The spliced temporary reads file could not be deleted
    #[error("Failed to remove temporary file '{}': {source}", path.display())]
    TempFileRemoval {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file does not start or end with the combined file signature
    #[error("Invalid combined file signature")]
    InvalidSignature,

    /// The trailing section marker does not match the header's marker
    #[error("Section marker mismatch at byte {0}")]
    SectionMarkerMismatch(u64),

    /// Invalid footer MAGIC found
    #[error("Invalid footer MAGIC found")]
    InvalidFooterMagic,

    /// The footer length recorded at the end of the file is out of range
    #[error("Footer length {length} is invalid for a file of {file_size} bytes")]
    InvalidFooterLength { length: i64, file_size: u64 },

    /// The writing software name in the footer is not valid UTF-8
    #[error("Footer software name is not valid UTF-8")]
    InvalidSoftwareName(#[from] std::str::Utf8Error),
}

/// Errors in [`FileWriterOptions`](crate::FileWriterOptions)
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No memory pool was provided
    #[error("Invalid memory pool specified for file writer")]
    MissingMemoryPool,

    /// The signal chunk size must be positive
    #[error("Maximum signal chunk size must be greater than zero")]
    InvalidChunkSize,

    /// A table batch size must be positive
    #[error("The {table} table batch size must be greater than zero")]
    InvalidBatchSize { table: &'static str },
}
