use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use uuid::Uuid;
use zstd::zstd_safe;

use crate::error::{Result, WriteError};

/// Writes a `u32` length prefix, rejecting lengths that do not fit
pub(crate) fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let len32 = u32::try_from(len).map_err(|_| WriteError::LengthOverflow(len))?;
    buf.write_u32::<LittleEndian>(len32)?;
    Ok(())
}

pub(crate) fn write_str(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    write_len(buf, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn write_pairs(buf: &mut Vec<u8>, pairs: &[(String, String)]) -> Result<()> {
    write_len(buf, pairs.len())?;
    for (key, value) in pairs {
        write_str(buf, key)?;
        write_str(buf, value)?;
    }
    Ok(())
}

/// Read ids are stored as their 16 RFC 4122 bytes
pub(crate) fn write_uuid(buf: &mut Vec<u8>, id: &Uuid) {
    buf.extend_from_slice(id.as_bytes());
}

/// Compresses `src` into `dst`, replacing its contents
pub(crate) fn sized_compress(
    dst: &mut Vec<u8>,
    src: &[u8],
    level: i32,
    cctx: &mut zstd_safe::CCtx,
) -> Result<()> {
    dst.clear();
    dst.reserve(zstd_safe::compress_bound(src.len()));

    // compress directly into the spare capacity of the destination
    cctx.compress(dst, src, level)
        .map_err(|e| io::Error::other(zstd_safe::get_error_name(e)))?;

    Ok(())
}
