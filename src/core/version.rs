use std::fmt;

use bytemuck::{Pod, Zeroable};

/// The format version written into schema metadata, the combined header,
/// and the combined footer.
pub const FORMAT_VERSION: Version = Version::new(0, 1, 0);

/// A three-part format version.
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
#[repr(C)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub revision: u16,
    reserved: u16,
}
impl Version {
    #[must_use]
    pub const fn new(major: u16, minor: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            revision,
            reserved: 0,
        }
    }
}
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}
