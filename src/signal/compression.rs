//! Signal sample codec
//!
//! Samples are delta encoded against their predecessor, zig-zag mapped so
//! that small negative and positive steps both become small unsigned values,
//! and the result is compressed with zstd. Nanopore signal moves in small
//! steps, so most mapped values fit in a single byte before zstd sees them.

use std::io;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;

/// zstd level used for signal chunks
pub const SIGNAL_COMPRESSION_LEVEL: i32 = 1;

#[inline]
fn zigzag(delta: i16) -> u16 {
    ((delta << 1) ^ (delta >> 15)) as u16
}

#[inline]
fn unzigzag(value: u16) -> i16 {
    ((value >> 1) as i16) ^ -((value & 1) as i16)
}

/// Compresses a chunk of samples
pub fn compress_signal(samples: &[i16]) -> Result<Vec<u8>> {
    let mut mapped = vec![0u8; samples.len() * 2];
    let mut previous = 0i16;
    for (sample, dst) in samples.iter().zip(mapped.chunks_exact_mut(2)) {
        LittleEndian::write_u16(dst, zigzag(sample.wrapping_sub(previous)));
        previous = *sample;
    }
    Ok(zstd::bulk::compress(&mapped, SIGNAL_COMPRESSION_LEVEL)?)
}

/// Decompresses a chunk produced by [`compress_signal`]
///
/// Fails if the data does not decode to exactly `sample_count` samples.
pub fn decompress_signal(bytes: &[u8], sample_count: u32) -> Result<Vec<i16>> {
    let expected = sample_count as usize * 2;
    let mapped = zstd::bulk::decompress(bytes, expected)?;
    if mapped.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "signal decoded to {} samples, expected {sample_count}",
                mapped.len() / 2
            ),
        )
        .into());
    }

    let mut previous = 0i16;
    Ok(mapped
        .chunks_exact(2)
        .map(|src| {
            previous = previous.wrapping_add(unzigzag(LittleEndian::read_u16(src)));
            previous
        })
        .collect())
}
