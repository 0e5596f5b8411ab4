mod dictionary_data;
mod read_data;
mod version;

pub use dictionary_data::{
    CalibrationData, EndReason, EndReasonData, KeyValueList, PoreData, RunInfoData,
};
pub(crate) use read_data::ReadRow;
pub use read_data::{
    CalibrationDictionaryIndex, DictionaryIndex, EndReasonDictionaryIndex, PoreDictionaryIndex,
    ReadData, ReadTableRowIndex, RunInfoDictionaryIndex, SignalTableRowIndex,
};
pub use version::{FORMAT_VERSION, Version};
