mod compression;
mod writer;

pub use compression::{SIGNAL_COMPRESSION_LEVEL, compress_signal, decompress_signal};
pub use writer::SignalTableWriter;
