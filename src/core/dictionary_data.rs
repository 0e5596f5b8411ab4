//! Records deduplicated by the dictionary writers
//!
//! Each record type is value-equal: two structurally identical records are
//! assigned the same [`DictionaryIndex`](crate::DictionaryIndex).

use std::hash::{Hash, Hasher};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::Result;
use crate::dictionary::{DictionaryKind, DictionaryRecord};
use crate::table::{TableRow, encode};

/// Ordered key/value pairs, as stored for context tags and tracking ids
pub type KeyValueList = Vec<(String, String)>;

/// The pore a read was sequenced on
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct PoreData {
    pub channel: u16,
    pub well: u8,
    pub pore_type: String,
}
impl TableRow for PoreData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u16::<LittleEndian>(self.channel)?;
        buf.write_u8(self.well)?;
        encode::write_str(buf, &self.pore_type)
    }
}
impl DictionaryRecord for PoreData {
    const KIND: DictionaryKind = DictionaryKind::Pore;
}

/// Conversion from ADC units to picoamps: `pA = (adc + offset) * scale`
#[derive(Clone, Copy, Debug, Default)]
pub struct CalibrationData {
    pub offset: f32,
    pub scale: f32,
}
impl CalibrationData {
    #[must_use]
    pub fn new(offset: f32, scale: f32) -> Self {
        Self { offset, scale }
    }
}
// Bitwise equality so that every calibration is usable as a map key
impl PartialEq for CalibrationData {
    fn eq(&self, other: &Self) -> bool {
        self.offset.to_bits() == other.offset.to_bits()
            && self.scale.to_bits() == other.scale.to_bits()
    }
}
impl Eq for CalibrationData {}
impl Hash for CalibrationData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.to_bits().hash(state);
        self.scale.to_bits().hash(state);
    }
}
impl TableRow for CalibrationData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_f32::<LittleEndian>(self.offset)?;
        buf.write_f32::<LittleEndian>(self.scale)?;
        Ok(())
    }
}
impl DictionaryRecord for CalibrationData {
    const KIND: DictionaryKind = DictionaryKind::Calibration;
}

/// Why a read ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EndReason {
    #[default]
    Unknown = 0,
    MuxChange = 1,
    UnblockMuxChange = 2,
    DataServiceUnblockMuxChange = 3,
    SignalPositive = 4,
    SignalNegative = 5,
}
impl EndReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MuxChange => "mux_change",
            Self::UnblockMuxChange => "unblock_mux_change",
            Self::DataServiceUnblockMuxChange => "data_service_unblock_mux_change",
            Self::SignalPositive => "signal_positive",
            Self::SignalNegative => "signal_negative",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct EndReasonData {
    pub name: EndReason,
    /// Whether the read was ended by an external action rather than the signal
    pub forced: bool,
}
impl TableRow for EndReasonData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_u8(self.name as u8)?;
        encode::write_str(buf, self.name.as_str())?;
        buf.write_u8(u8::from(self.forced))?;
        Ok(())
    }
}
impl DictionaryRecord for EndReasonData {
    const KIND: DictionaryKind = DictionaryKind::EndReason;
}

/// Acquisition-level metadata shared by every read of one run
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct RunInfoData {
    pub acquisition_id: String,
    /// Milliseconds since the unix epoch
    pub acquisition_start_time: i64,
    pub adc_max: i16,
    pub adc_min: i16,
    pub context_tags: KeyValueList,
    pub experiment_name: String,
    pub flow_cell_id: String,
    pub flow_cell_product_code: String,
    pub protocol_name: String,
    pub protocol_run_id: String,
    /// Milliseconds since the unix epoch
    pub protocol_start_time: i64,
    pub sample_id: String,
    pub sample_rate: u16,
    pub sequencing_kit: String,
    pub sequencer_position: String,
    pub sequencer_position_type: String,
    pub software: String,
    pub system_name: String,
    pub system_type: String,
    pub tracking_id: KeyValueList,
}
impl TableRow for RunInfoData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        encode::write_str(buf, &self.acquisition_id)?;
        buf.write_i64::<LittleEndian>(self.acquisition_start_time)?;
        buf.write_i16::<LittleEndian>(self.adc_max)?;
        buf.write_i16::<LittleEndian>(self.adc_min)?;
        encode::write_pairs(buf, &self.context_tags)?;
        encode::write_str(buf, &self.experiment_name)?;
        encode::write_str(buf, &self.flow_cell_id)?;
        encode::write_str(buf, &self.flow_cell_product_code)?;
        encode::write_str(buf, &self.protocol_name)?;
        encode::write_str(buf, &self.protocol_run_id)?;
        buf.write_i64::<LittleEndian>(self.protocol_start_time)?;
        encode::write_str(buf, &self.sample_id)?;
        buf.write_u16::<LittleEndian>(self.sample_rate)?;
        encode::write_str(buf, &self.sequencing_kit)?;
        encode::write_str(buf, &self.sequencer_position)?;
        encode::write_str(buf, &self.sequencer_position_type)?;
        encode::write_str(buf, &self.software)?;
        encode::write_str(buf, &self.system_name)?;
        encode::write_str(buf, &self.system_type)?;
        encode::write_pairs(buf, &self.tracking_id)
    }
}
impl DictionaryRecord for RunInfoData {
    const KIND: DictionaryKind = DictionaryKind::RunInfo;
}
