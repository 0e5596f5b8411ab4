use std::io::{Read, Seek, SeekFrom, Write};

use bytemuck::{Pod, Zeroable};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::core::Version;
use crate::error::{CombinedError, Result};
use crate::stream::Tell;
use crate::table::encode::write_str;

use super::{
    COMBINED_HEADER_SIZE, FILE_SIGNATURE, FOOTER_MAGIC, SECTION_ALIGNMENT, SECTION_MARKER_SIZE,
    pad_to_alignment, write_section_marker,
};

/// Footer length, section marker, and signature at the very end of the file
const TRAILER_SIZE: u64 = 8 + SECTION_MARKER_SIZE + FILE_SIGNATURE.len() as u64;

/// Location of an embedded table within the combined file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FileInfo {
    /// Byte offset of the table's first byte
    pub file_start_offset: i64,
    /// Length of the table in bytes
    pub file_length: i64,
}
impl FileInfo {
    #[must_use]
    pub fn new(file_start_offset: u64, file_length: u64) -> Self {
        Self {
            file_start_offset: file_start_offset as i64,
            file_length: file_length as i64,
        }
    }

    /// Offset of the first byte past the table
    #[must_use]
    pub fn end_offset(&self) -> i64 {
        self.file_start_offset + self.file_length
    }
}

/// Fixed size footer fields following [`FOOTER_MAGIC`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct FooterFields {
    pub file_identifier: [u8; 16],
    pub version: Version,
    pub signal_table: FileInfo,
    pub read_table: FileInfo,
}

/// Writes the footer and the closing trailer of a combined file
///
/// The stream is expected to sit just past the section marker that ends the
/// last table.
pub fn write_footer<W: Write + Tell>(
    writer: &mut W,
    section_marker: &Uuid,
    fields: &FooterFields,
    writing_software: &str,
) -> Result<()> {
    let start = writer.tell()?;
    writer.write_all(FOOTER_MAGIC)?;
    writer.write_all(bytemuck::bytes_of(fields))?;

    let mut name = Vec::with_capacity(writing_software.len() + 4);
    write_str(&mut name, writing_software)?;
    writer.write_all(&name)?;
    pad_to_alignment(writer, SECTION_ALIGNMENT)?;

    let footer_length = writer.tell()? - start;
    writer.write_i64::<LittleEndian>(footer_length as i64)?;
    write_section_marker(writer, section_marker)?;
    writer.write_all(FILE_SIGNATURE)?;
    Ok(())
}

/// A parsed combined file footer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Footer {
    pub file_identifier: Uuid,
    pub version: Version,
    pub writing_software: String,
    pub signal_table: FileInfo,
    pub read_table: FileInfo,
    pub section_marker: Uuid,
}
impl Footer {
    /// Locates and parses the footer of a complete combined file
    ///
    /// Checks the leading and trailing signatures and that every section
    /// marker the footer implies matches the one in the file header.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        if file_size < COMBINED_HEADER_SIZE + TRAILER_SIZE {
            return Err(CombinedError::InvalidSignature.into());
        }

        // leading signature and marker
        reader.seek(SeekFrom::Start(0))?;
        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature)?;
        if &signature != FILE_SIGNATURE {
            return Err(CombinedError::InvalidSignature.into());
        }
        let section_marker = read_uuid(reader)?;

        // an unfinished file has no trailing signature
        reader.seek(SeekFrom::End(-(FILE_SIGNATURE.len() as i64)))?;
        reader.read_exact(&mut signature)?;
        if &signature != FILE_SIGNATURE {
            return Err(CombinedError::InvalidSignature.into());
        }

        reader.seek(SeekFrom::Start(file_size - TRAILER_SIZE))?;
        let footer_length = reader.read_i64::<LittleEndian>()?;
        expect_marker(reader, &section_marker)?;

        let fixed = (FOOTER_MAGIC.len() + std::mem::size_of::<FooterFields>() + 4) as i64;
        let footer_start = u64::try_from(footer_length)
            .ok()
            .filter(|_| footer_length >= fixed)
            .and_then(|len| (file_size - TRAILER_SIZE).checked_sub(len))
            .filter(|&start| start >= COMBINED_HEADER_SIZE + SECTION_MARKER_SIZE)
            .ok_or(CombinedError::InvalidFooterLength {
                length: footer_length,
                file_size,
            })?;

        reader.seek(SeekFrom::Start(footer_start - SECTION_MARKER_SIZE))?;
        expect_marker(reader, &section_marker)?;

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != FOOTER_MAGIC {
            return Err(CombinedError::InvalidFooterMagic.into());
        }

        let mut fields = FooterFields::zeroed();
        reader.read_exact(bytemuck::bytes_of_mut(&mut fields))?;

        let name_len = reader.read_u32::<LittleEndian>()? as i64;
        if name_len > footer_length - fixed {
            return Err(CombinedError::InvalidFooterLength {
                length: footer_length,
                file_size,
            }
            .into());
        }
        let mut name = vec![0u8; name_len as usize];
        reader.read_exact(&mut name)?;
        let writing_software = std::str::from_utf8(&name)
            .map_err(CombinedError::from)?
            .to_string();

        // the read table is preceded by its own section marker
        if let Some(marker_offset) = u64::try_from(fields.read_table.file_start_offset)
            .ok()
            .and_then(|start| start.checked_sub(SECTION_MARKER_SIZE))
        {
            reader.seek(SeekFrom::Start(marker_offset))?;
            expect_marker(reader, &section_marker)?;
        }

        Ok(Self {
            file_identifier: Uuid::from_bytes(fields.file_identifier),
            version: fields.version,
            writing_software,
            signal_table: fields.signal_table,
            read_table: fields.read_table,
            section_marker,
        })
    }
}

fn read_uuid<R: Read>(reader: &mut R) -> Result<Uuid> {
    let mut bytes = [0u8; 16];
    reader.read_exact(&mut bytes)?;
    Ok(Uuid::from_bytes(bytes))
}

fn expect_marker<R: Read + Seek>(reader: &mut R, section_marker: &Uuid) -> Result<()> {
    let position = reader.stream_position()?;
    if read_uuid(reader)? == *section_marker {
        Ok(())
    } else {
        Err(CombinedError::SectionMarkerMismatch(position).into())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::combined::write_combined_header;
    use crate::core::FORMAT_VERSION;
    use crate::error::Error;

    fn sample_file(software: &str) -> Result<(Vec<u8>, FooterFields)> {
        let marker = Uuid::from_u128(0x5EC7_10AA);
        let id = Uuid::from_u128(0xF11E);

        let mut buf = Vec::new();
        write_combined_header(&mut buf, &marker, &id, FORMAT_VERSION)?;

        // a fake 13 byte signal table
        buf.extend_from_slice(&[0x51; 13]);
        let signal = FileInfo::new(COMBINED_HEADER_SIZE, 13);
        pad_to_alignment(&mut buf, SECTION_ALIGNMENT)?;
        write_section_marker(&mut buf, &marker)?;

        // and a 5 byte read table
        let read_start = buf.len() as u64;
        buf.extend_from_slice(&[0x52; 5]);
        let read = FileInfo::new(read_start, 5);
        pad_to_alignment(&mut buf, SECTION_ALIGNMENT)?;
        write_section_marker(&mut buf, &marker)?;

        let fields = FooterFields {
            file_identifier: *id.as_bytes(),
            version: FORMAT_VERSION,
            signal_table: signal,
            read_table: read,
        };
        write_footer(&mut buf, &marker, &fields, software)?;
        Ok((buf, fields))
    }

    #[test]
    fn test_footer_layout() -> Result<()> {
        let (buf, fields) = sample_file("pod5-writer-test")?;
        assert_eq!(buf.len() % 8, 0);
        assert_eq!(&buf[buf.len() - 8..], FILE_SIGNATURE);

        let footer = Footer::read_from(&mut Cursor::new(&buf))?;
        assert_eq!(footer.file_identifier, Uuid::from_u128(0xF11E));
        assert_eq!(footer.section_marker, Uuid::from_u128(0x5EC7_10AA));
        assert_eq!(footer.version, FORMAT_VERSION);
        assert_eq!(footer.writing_software, "pod5-writer-test");
        assert_eq!(footer.signal_table, fields.signal_table);
        assert_eq!(footer.read_table, fields.read_table);

        // the read table starts on an aligned boundary after the marker
        assert_eq!(footer.read_table.file_start_offset, 96);
        Ok(())
    }

    #[test]
    fn test_truncated_file_rejected() -> Result<()> {
        let (buf, _) = sample_file("short")?;
        let truncated = &buf[..buf.len() - 8];
        let err = Footer::read_from(&mut Cursor::new(truncated)).err();
        assert!(matches!(
            err,
            Some(Error::CombinedError(CombinedError::InvalidSignature))
        ));
        Ok(())
    }

    #[test]
    fn test_marker_mismatch_rejected() -> Result<()> {
        let (mut buf, _) = sample_file("marker")?;
        let at = buf.len() - 24;
        buf[at] ^= 0xFF;
        let err = Footer::read_from(&mut Cursor::new(&buf)).err();
        assert!(matches!(
            err,
            Some(Error::CombinedError(CombinedError::SectionMarkerMismatch(_)))
        ));
        Ok(())
    }
}
