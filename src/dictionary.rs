//! Deduplicating dictionary writers
//!
//! Each distinct record is assigned the next index on first insertion;
//! inserting an equal record again returns the index it already has.
//! Indices start at zero, are handed out in insertion order, and are never
//! reused. Entries are written into the read table as dictionary batches, so
//! every dictionary tracks how many of its entries have reached the stream.

use std::collections::HashMap;
use std::hash::Hash;
use std::io::Write;

use crate::core::{
    CalibrationData, DictionaryIndex, EndReasonData, PoreData, ReadData, RunInfoData,
};
use crate::error::{Result, WriteError};
use crate::stream::Tell;
use crate::table::{TableRow, TableWriter};

/// Maximum number of entries one dictionary can hold
pub const MAX_DICTIONARY_ENTRIES: usize = DictionaryIndex::MAX as usize + 1;

/// Identifies a dictionary within the read table's dictionary batches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DictionaryKind {
    Pore = 1,
    Calibration = 2,
    EndReason = 3,
    RunInfo = 4,
}
impl DictionaryKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pore => "pore",
            Self::Calibration => "calibration",
            Self::EndReason => "end reason",
            Self::RunInfo => "run info",
        }
    }
}

/// A record type that can be stored in a dictionary
pub trait DictionaryRecord: TableRow + Clone + Eq + Hash {
    const KIND: DictionaryKind;
}

pub struct DictionaryWriter<T: DictionaryRecord> {
    lookup: HashMap<T, DictionaryIndex>,
    /// Entries in index order
    values: Vec<T>,
    /// Number of leading entries already written to the read table
    written: usize,
}
impl<T: DictionaryRecord> Default for DictionaryWriter<T> {
    fn default() -> Self {
        Self {
            lookup: HashMap::new(),
            values: Vec::new(),
            written: 0,
        }
    }
}
impl<T: DictionaryRecord> DictionaryWriter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `value`, inserting it if it has not been seen
    pub fn add(&mut self, value: &T) -> Result<DictionaryIndex> {
        if let Some(&index) = self.lookup.get(value) {
            return Ok(index);
        }
        if self.values.len() >= MAX_DICTIONARY_ENTRIES {
            return Err(WriteError::DictionaryFull {
                dictionary: T::KIND.name(),
                capacity: MAX_DICTIONARY_ENTRIES,
            }
            .into());
        }

        let index = self.values.len() as DictionaryIndex;
        self.lookup.insert(value.clone(), index);
        self.values.push(value.clone());
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: DictionaryIndex) -> Option<&T> {
        self.values.get(usize::from(index))
    }

    pub fn has_index(&self, index: DictionaryIndex) -> bool {
        usize::from(index) < self.values.len()
    }

    /// Entries added since the last [`write_pending`](Self::write_pending)
    pub fn pending(&self) -> &[T] {
        &self.values[self.written..]
    }

    /// Writes the pending entries to `table` as one dictionary batch
    pub fn write_pending<W: Write + Tell>(&mut self, table: &mut TableWriter<W>) -> Result<()> {
        if self.written == self.values.len() {
            return Ok(());
        }
        table.write_dictionary_batch(T::KIND as u8, self.pending())?;
        self.written = self.values.len();
        Ok(())
    }

    /// Checks that `index` has been handed out by this dictionary
    pub fn check_index(&self, index: DictionaryIndex) -> Result<()> {
        if self.has_index(index) {
            Ok(())
        } else {
            Err(WriteError::UnknownDictionaryIndex {
                dictionary: T::KIND.name(),
                index,
                len: self.values.len(),
            }
            .into())
        }
    }
}

/// The four dictionaries referenced by every read row
#[derive(Default)]
pub struct DictionaryWriters {
    pub pore: DictionaryWriter<PoreData>,
    pub calibration: DictionaryWriter<CalibrationData>,
    pub end_reason: DictionaryWriter<EndReasonData>,
    pub run_info: DictionaryWriter<RunInfoData>,
}
impl DictionaryWriters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every dictionary index referenced by `read_data`
    pub fn check_read(&self, read_data: &ReadData) -> Result<()> {
        self.pore.check_index(read_data.pore)?;
        self.calibration.check_index(read_data.calibration)?;
        self.end_reason.check_index(read_data.end_reason)?;
        self.run_info.check_index(read_data.run_info)
    }

    /// Writes every dictionary's pending entries to `table`
    pub fn write_pending<W: Write + Tell>(&mut self, table: &mut TableWriter<W>) -> Result<()> {
        self.pore.write_pending(table)?;
        self.calibration.write_pending(table)?;
        self.end_reason.write_pending(table)?;
        self.run_info.write_pending(table)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::core::{EndReason, FORMAT_VERSION};
    use crate::pool::MemoryPool;
    use crate::table::testing::ParsedTable;
    use crate::table::{BATCH_DICTIONARY, SchemaMetadata, TableKind};

    fn pore(channel: u16) -> PoreData {
        PoreData {
            channel,
            well: 1,
            pore_type: "not_set".to_string(),
        }
    }

    #[test]
    fn test_duplicate_insertion_is_idempotent() -> Result<()> {
        let mut dict = DictionaryWriter::new();
        for _ in 0..5 {
            assert_eq!(dict.add(&pore(7))?, 0);
        }
        assert_eq!(dict.len(), 1);
        Ok(())
    }

    #[test]
    fn test_distinct_values_get_sequential_indices() -> Result<()> {
        let mut dict = DictionaryWriter::new();
        let calibrations: Vec<_> = (0..10)
            .map(|i| CalibrationData::new(i as f32, 0.5))
            .collect();
        for (expected, calibration) in calibrations.iter().enumerate() {
            assert_eq!(usize::from(dict.add(calibration)?), expected);
        }
        // re-inserting in a different order does not reassign
        for (expected, calibration) in calibrations.iter().enumerate().rev() {
            assert_eq!(usize::from(dict.add(calibration)?), expected);
        }
        assert_eq!(dict.get(3), Some(&calibrations[3]));
        assert!(dict.has_index(9));
        assert!(!dict.has_index(10));
        Ok(())
    }

    #[test]
    fn test_check_index() -> Result<()> {
        let mut dict = DictionaryWriter::new();
        dict.add(&EndReasonData {
            name: EndReason::MuxChange,
            forced: false,
        })?;
        dict.check_index(0)?;
        assert!(matches!(
            dict.check_index(1),
            Err(crate::Error::WriteError(WriteError::UnknownDictionaryIndex {
                index: 1,
                len: 1,
                ..
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_dictionary_full() -> Result<()> {
        let mut dict = DictionaryWriter::new();
        for i in 0..MAX_DICTIONARY_ENTRIES {
            dict.add(&CalibrationData::new(i as f32, 1.0))?;
        }
        // existing values still resolve
        assert_eq!(dict.add(&CalibrationData::new(0.0, 1.0))?, 0);
        assert!(matches!(
            dict.add(&CalibrationData::new(-1.0, 1.0)),
            Err(crate::Error::WriteError(WriteError::DictionaryFull { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_pending_entries_written_once() -> Result<()> {
        let mut table = TableWriter::new(
            Vec::new(),
            TableKind::Read,
            &SchemaMetadata::new(Uuid::nil(), "dictionary-tests", FORMAT_VERSION),
            10,
            Arc::new(MemoryPool::new()),
        )?;

        let mut dicts = DictionaryWriters::new();
        dicts.pore.add(&pore(1))?;
        dicts.pore.add(&pore(2))?;
        dicts.write_pending(&mut table)?;
        assert!(dicts.pore.pending().is_empty());

        // nothing new, nothing written
        dicts.write_pending(&mut table)?;

        dicts.pore.add(&pore(3))?;
        dicts.run_info.add(&RunInfoData::default())?;
        dicts.write_pending(&mut table)?;
        table.close()?;

        let parsed = ParsedTable::parse(&table.into_inner())?;
        let batches: Vec<_> = parsed
            .batches
            .iter()
            .map(|b| (b.header.content, b.header.dictionary, b.header.num_rows))
            .collect();
        assert_eq!(
            batches,
            [
                (BATCH_DICTIONARY, DictionaryKind::Pore as u8, 2),
                (BATCH_DICTIONARY, DictionaryKind::Pore as u8, 1),
                (BATCH_DICTIONARY, DictionaryKind::RunInfo as u8, 1),
            ]
        );
        Ok(())
    }
}
