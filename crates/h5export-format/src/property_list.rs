//! Property lists for link creation and file creation.
//!
//! Property lists bundle the knobs of an operation into a reusable value,
//! built with chained setters.

/// Link creation properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCreateProps {
    /// Create missing groups along the path instead of failing.
    pub create_intermediate_groups: bool,
}

impl LinkCreateProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auto-create intermediate groups.
    pub fn create_intermediate_groups(mut self, yes: bool) -> Self {
        self.create_intermediate_groups = yes;
        self
    }
}

/// File creation properties: how a container is laid out when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCreateProps {
    /// Superblock version, 2 or 3.
    pub superblock_version: u8,
    /// Width of stored addresses (2, 4, or 8).
    pub offset_size: u8,
    /// Width of stored lengths (2, 4, or 8).
    pub length_size: u8,
}

impl Default for FileCreateProps {
    fn default() -> Self {
        Self {
            superblock_version: 3,
            offset_size: 8,
            length_size: 8,
        }
    }
}

impl FileCreateProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn superblock_version(mut self, version: u8) -> Self {
        self.superblock_version = version;
        self
    }

    /// Set the address and length widths together.
    pub fn sizes(mut self, offset_size: u8, length_size: u8) -> Self {
        self.offset_size = offset_size;
        self.length_size = length_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert!(!LinkCreateProps::new().create_intermediate_groups);
        let fcpl = FileCreateProps::new();
        assert_eq!(fcpl.superblock_version, 3);
        assert_eq!((fcpl.offset_size, fcpl.length_size), (8, 8));
    }

    #[test]
    fn builders_chain() {
        let lcpl = LinkCreateProps::new().create_intermediate_groups(true);
        assert!(lcpl.create_intermediate_groups);
        let fcpl = FileCreateProps::new().superblock_version(2).sizes(4, 4);
        assert_eq!(fcpl.superblock_version, 2);
        assert_eq!(fcpl.offset_size, 4);
    }
}
