use byteorder::{LittleEndian, WriteBytesExt};
use uuid::Uuid;

use crate::Result;
use crate::table::{TableRow, encode};

/// Index of a record within one of the four dictionaries
pub type DictionaryIndex = u16;

pub type PoreDictionaryIndex = DictionaryIndex;
pub type CalibrationDictionaryIndex = DictionaryIndex;
pub type EndReasonDictionaryIndex = DictionaryIndex;
pub type RunInfoDictionaryIndex = DictionaryIndex;

/// Index of a row in the signal table
pub type SignalTableRowIndex = u64;

/// Index of a row in the read table
pub type ReadTableRowIndex = u64;

/// Metadata describing one sequenced read.
///
/// Dictionary fields hold indices previously returned by the matching
/// `add_*` call on the [`FileWriter`](crate::FileWriter).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadData {
    /// Unique identifier of the read
    pub read_id: Uuid,
    pub pore: PoreDictionaryIndex,
    pub calibration: CalibrationDictionaryIndex,
    /// Read number assigned by the sequencer on its channel
    pub read_number: u32,
    /// Sample offset of the read start since the beginning of the run
    pub start_sample: u64,
    /// Median current level preceding the read
    pub median_before: f32,
    pub end_reason: EndReasonDictionaryIndex,
    pub run_info: RunInfoDictionaryIndex,
}

/// A read table row: the read metadata plus its signal row manifest
pub(crate) struct ReadRow<'a> {
    pub(crate) data: &'a ReadData,
    pub(crate) signal_rows: &'a [SignalTableRowIndex],
}
impl TableRow for ReadRow<'_> {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        let data = self.data;
        encode::write_uuid(buf, &data.read_id);
        buf.write_u16::<LittleEndian>(data.pore)?;
        buf.write_u16::<LittleEndian>(data.calibration)?;
        buf.write_u32::<LittleEndian>(data.read_number)?;
        buf.write_u64::<LittleEndian>(data.start_sample)?;
        buf.write_f32::<LittleEndian>(data.median_before)?;
        buf.write_u16::<LittleEndian>(data.end_reason)?;
        buf.write_u16::<LittleEndian>(data.run_info)?;

        encode::write_len(buf, self.signal_rows.len())?;
        self.signal_rows
            .iter()
            .try_for_each(|&row| buf.write_u64::<LittleEndian>(row))?;
        Ok(())
    }
}
