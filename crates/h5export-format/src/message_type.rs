//! Header message type codes.

macro_rules! message_types {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// Header message types this layer interprets. Everything else is
        /// carried through as [`MessageType::Unknown`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageType {
            $($(#[$doc])* $name,)*
            /// Any other message type, kept with its raw code.
            Unknown(u16),
        }

        impl MessageType {
            /// Map a raw type code.
            pub fn from_u16(code: u16) -> MessageType {
                match code {
                    $($code => MessageType::$name,)*
                    other => MessageType::Unknown(other),
                }
            }

            /// The raw type code.
            pub fn to_u16(self) -> u16 {
                match self {
                    $(MessageType::$name => $code,)*
                    MessageType::Unknown(code) => code,
                }
            }
        }
    };
}

message_types! {
    Nil = 0x0000,
    Dataspace = 0x0001,
    /// Link info: presence marks a "new style" group.
    LinkInfo = 0x0002,
    Datatype = 0x0003,
    FillValueOld = 0x0004,
    FillValue = 0x0005,
    Link = 0x0006,
    /// External data files: raw data kept in other files, named through a
    /// local heap.
    ExternalDataFiles = 0x0007,
    DataLayout = 0x0008,
    GroupInfo = 0x000A,
    FilterPipeline = 0x000B,
    Attribute = 0x000C,
    ObjectHeaderContinuation = 0x0010,
    /// Symbol table: presence marks an "old style" group.
    SymbolTable = 0x0011,
    ObjectModificationTime = 0x0012,
    AttributeInfo = 0x0015,
    ObjectReferenceCount = 0x0016,
}

impl MessageType {
    /// Messages that describe group membership. They are regenerated from
    /// the tree when a file is rewritten and never carried through raw.
    pub fn is_group_structure(self) -> bool {
        matches!(
            self,
            MessageType::LinkInfo
                | MessageType::Link
                | MessageType::GroupInfo
                | MessageType::SymbolTable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_both_ways() {
        for code in 0u16..0x20 {
            assert_eq!(MessageType::from_u16(code).to_u16(), code);
        }
        assert_eq!(MessageType::from_u16(0x0011), MessageType::SymbolTable);
        assert_eq!(MessageType::from_u16(0x0007), MessageType::ExternalDataFiles);
        assert_eq!(MessageType::from_u16(0x0009), MessageType::Unknown(9));
    }

    #[test]
    fn classification() {
        assert!(MessageType::Link.is_group_structure());
        assert!(!MessageType::Attribute.is_group_structure());
        assert!(MessageType::SymbolTable.is_group_structure());
        assert!(!MessageType::DataLayout.is_group_structure());
    }
}
