use std::io::Write;

use bytemuck::{Pod, Zeroable};
use uuid::Uuid;

use crate::core::Version;
use crate::error::Result;
use crate::stream::Tell;

use super::FILE_SIGNATURE;

/// Fixed fields between the two leading section markers.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct CombinedHeader {
    pub file_identifier: [u8; 16],
    pub version: Version,
}
impl CombinedHeader {
    #[must_use]
    pub fn new(file_identifier: &Uuid, version: Version) -> Self {
        Self {
            file_identifier: *file_identifier.as_bytes(),
            version,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

pub fn write_section_marker<W: Write>(writer: &mut W, section_marker: &Uuid) -> Result<()> {
    writer.write_all(section_marker.as_bytes())?;
    Ok(())
}

/// Writes the signature, header fields, and their framing markers
pub fn write_combined_header<W: Write>(
    writer: &mut W,
    section_marker: &Uuid,
    file_identifier: &Uuid,
    version: Version,
) -> Result<()> {
    writer.write_all(FILE_SIGNATURE)?;
    write_section_marker(writer, section_marker)?;
    writer.write_all(CombinedHeader::new(file_identifier, version).as_bytes())?;
    write_section_marker(writer, section_marker)?;
    Ok(())
}

/// Writes zero bytes until the stream position is a multiple of `alignment`
///
/// Returns the number of padding bytes written.
pub fn pad_to_alignment<W: Write + Tell>(writer: &mut W, alignment: u64) -> Result<u64> {
    const ZEROS: [u8; 64] = [0; 64];
    debug_assert!(alignment > 0 && alignment <= ZEROS.len() as u64);

    let position = writer.tell()?;
    let padding = (alignment - position % alignment) % alignment;
    writer.write_all(&ZEROS[..padding as usize])?;
    Ok(padding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combined::COMBINED_HEADER_SIZE;
    use crate::core::FORMAT_VERSION;

    #[test]
    fn test_header_size() -> Result<()> {
        let marker = Uuid::from_u128(0xAA);
        let id = Uuid::from_u128(0xBB);
        let mut buf = Vec::new();
        write_combined_header(&mut buf, &marker, &id, FORMAT_VERSION)?;

        assert_eq!(buf.len() as u64, COMBINED_HEADER_SIZE);
        assert_eq!(&buf[..8], FILE_SIGNATURE);
        assert_eq!(&buf[8..24], marker.as_bytes());
        assert_eq!(&buf[24..40], id.as_bytes());
        assert_eq!(&buf[48..64], marker.as_bytes());
        Ok(())
    }

    #[test]
    fn test_padding() -> Result<()> {
        for len in 0..20u64 {
            let mut buf = vec![1u8; len as usize];
            let padding = pad_to_alignment(&mut buf, 8)?;
            assert_eq!(buf.len() % 8, 0);
            assert!(padding < 8);
            assert_eq!(buf.len() as u64, len + padding);
            assert!(buf[len as usize..].iter().all(|&b| b == 0));
        }
        Ok(())
    }
}
