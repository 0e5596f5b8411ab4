use uuid::Uuid;

use crate::Result;
use crate::core::Version;

use super::encode;

pub const KEY_FILE_IDENTIFIER: &str = "pod5:file_identifier";
pub const KEY_WRITING_SOFTWARE: &str = "pod5:writing_software";
pub const KEY_VERSION: &str = "pod5:version";
pub const KEY_SIGNAL_TYPE: &str = "pod5:signal_type";

/// Key/value metadata embedded in the header of every table
///
/// Binds each table to the file it was written for, which lets a reader of a
/// split layout check that the two files belong together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaMetadata {
    pub file_identifier: Uuid,
    pub writing_software: String,
    pub version: Version,
    /// Table specific entries, written after the common keys
    extra: Vec<(String, String)>,
}
impl SchemaMetadata {
    #[must_use]
    pub fn new(file_identifier: Uuid, writing_software: &str, version: Version) -> Self {
        Self {
            file_identifier,
            writing_software: writing_software.to_string(),
            version,
            extra: Vec::new(),
        }
    }

    /// Returns a copy with one more table specific entry
    #[must_use]
    pub fn with_entry(&self, key: &str, value: &str) -> Self {
        let mut metadata = self.clone();
        metadata.extra.push((key.to_string(), value.to_string()));
        metadata
    }

    #[must_use]
    pub fn key_values(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                KEY_FILE_IDENTIFIER.to_string(),
                self.file_identifier.hyphenated().to_string(),
            ),
            (
                KEY_WRITING_SOFTWARE.to_string(),
                self.writing_software.clone(),
            ),
            (KEY_VERSION.to_string(), self.version.to_string()),
        ];
        pairs.extend(self.extra.iter().cloned());
        pairs
    }

    /// Encodes the pairs as consecutive length-prefixed strings
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) -> Result<u32> {
        let pairs = self.key_values();
        for (key, value) in &pairs {
            encode::write_str(buf, key)?;
            encode::write_str(buf, value)?;
        }
        Ok(pairs.len() as u32)
    }
}
