//! Element type tags and the on-disk to native mapping.

use std::collections::HashMap;
use std::fmt;

use h5export_format::datatype::{ByteOrder, Datatype};

use crate::library;

/// An element type, either as stored on disk (fixed byte order) or as held
/// in memory (native byte order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    StdI8Be,
    StdI8Le,
    StdU8Be,
    StdU8Le,
    StdI16Be,
    StdI16Le,
    StdU16Be,
    StdU16Le,
    StdI32Be,
    StdI32Le,
    StdU32Be,
    StdU32Le,
    StdI64Be,
    StdI64Le,
    StdU64Be,
    StdU64Le,
    IeeeF32Be,
    IeeeF32Le,
    IeeeF64Be,
    IeeeF64Le,
    NativeInt8,
    NativeUint8,
    NativeInt16,
    NativeUint16,
    NativeInt32,
    NativeUint32,
    NativeInt64,
    NativeUint64,
    NativeFloat,
    NativeDouble,
}

/// Every on-disk tag and the native tag it transfers through.
const STD_TO_NATIVE: [(TypeTag, TypeTag); 20] = [
    (TypeTag::StdI8Be, TypeTag::NativeInt8),
    (TypeTag::StdI8Le, TypeTag::NativeInt8),
    (TypeTag::StdU8Be, TypeTag::NativeUint8),
    (TypeTag::StdU8Le, TypeTag::NativeUint8),
    (TypeTag::StdI16Be, TypeTag::NativeInt16),
    (TypeTag::StdI16Le, TypeTag::NativeInt16),
    (TypeTag::StdU16Be, TypeTag::NativeUint16),
    (TypeTag::StdU16Le, TypeTag::NativeUint16),
    (TypeTag::StdI32Be, TypeTag::NativeInt32),
    (TypeTag::StdI32Le, TypeTag::NativeInt32),
    (TypeTag::StdU32Be, TypeTag::NativeUint32),
    (TypeTag::StdU32Le, TypeTag::NativeUint32),
    (TypeTag::StdI64Be, TypeTag::NativeInt64),
    (TypeTag::StdI64Le, TypeTag::NativeInt64),
    (TypeTag::StdU64Be, TypeTag::NativeUint64),
    (TypeTag::StdU64Le, TypeTag::NativeUint64),
    (TypeTag::IeeeF32Be, TypeTag::NativeFloat),
    (TypeTag::IeeeF32Le, TypeTag::NativeFloat),
    (TypeTag::IeeeF64Be, TypeTag::NativeDouble),
    (TypeTag::IeeeF64Le, TypeTag::NativeDouble),
];

pub(crate) fn native_table() -> HashMap<TypeTag, TypeTag> {
    STD_TO_NATIVE.iter().copied().collect()
}

/// The native tag used to transfer elements stored as `tag`.
///
/// Tags with no on-disk entry (the native tags themselves) come back
/// unchanged.
pub fn lookup_native_type(tag: TypeTag) -> TypeTag {
    library::with_state(|state| state.native_type(tag))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Signed,
    Unsigned,
    Float,
}

impl TypeTag {
    /// All thirty tags, on-disk ones first.
    pub const ALL: [TypeTag; 30] = [
        TypeTag::StdI8Be,
        TypeTag::StdI8Le,
        TypeTag::StdU8Be,
        TypeTag::StdU8Le,
        TypeTag::StdI16Be,
        TypeTag::StdI16Le,
        TypeTag::StdU16Be,
        TypeTag::StdU16Le,
        TypeTag::StdI32Be,
        TypeTag::StdI32Le,
        TypeTag::StdU32Be,
        TypeTag::StdU32Le,
        TypeTag::StdI64Be,
        TypeTag::StdI64Le,
        TypeTag::StdU64Be,
        TypeTag::StdU64Le,
        TypeTag::IeeeF32Be,
        TypeTag::IeeeF32Le,
        TypeTag::IeeeF64Be,
        TypeTag::IeeeF64Le,
        TypeTag::NativeInt8,
        TypeTag::NativeUint8,
        TypeTag::NativeInt16,
        TypeTag::NativeUint16,
        TypeTag::NativeInt32,
        TypeTag::NativeUint32,
        TypeTag::NativeInt64,
        TypeTag::NativeUint64,
        TypeTag::NativeFloat,
        TypeTag::NativeDouble,
    ];

    /// Class, size in bytes, and byte order (`None` for native tags).
    fn layout(self) -> (Class, u32, Option<ByteOrder>) {
        use ByteOrder::{BigEndian as Be, LittleEndian as Le};
        use Class::*;
        match self {
            TypeTag::StdI8Be => (Signed, 1, Some(Be)),
            TypeTag::StdI8Le => (Signed, 1, Some(Le)),
            TypeTag::StdU8Be => (Unsigned, 1, Some(Be)),
            TypeTag::StdU8Le => (Unsigned, 1, Some(Le)),
            TypeTag::StdI16Be => (Signed, 2, Some(Be)),
            TypeTag::StdI16Le => (Signed, 2, Some(Le)),
            TypeTag::StdU16Be => (Unsigned, 2, Some(Be)),
            TypeTag::StdU16Le => (Unsigned, 2, Some(Le)),
            TypeTag::StdI32Be => (Signed, 4, Some(Be)),
            TypeTag::StdI32Le => (Signed, 4, Some(Le)),
            TypeTag::StdU32Be => (Unsigned, 4, Some(Be)),
            TypeTag::StdU32Le => (Unsigned, 4, Some(Le)),
            TypeTag::StdI64Be => (Signed, 8, Some(Be)),
            TypeTag::StdI64Le => (Signed, 8, Some(Le)),
            TypeTag::StdU64Be => (Unsigned, 8, Some(Be)),
            TypeTag::StdU64Le => (Unsigned, 8, Some(Le)),
            TypeTag::IeeeF32Be => (Float, 4, Some(Be)),
            TypeTag::IeeeF32Le => (Float, 4, Some(Le)),
            TypeTag::IeeeF64Be => (Float, 8, Some(Be)),
            TypeTag::IeeeF64Le => (Float, 8, Some(Le)),
            TypeTag::NativeInt8 => (Signed, 1, None),
            TypeTag::NativeUint8 => (Unsigned, 1, None),
            TypeTag::NativeInt16 => (Signed, 2, None),
            TypeTag::NativeUint16 => (Unsigned, 2, None),
            TypeTag::NativeInt32 => (Signed, 4, None),
            TypeTag::NativeUint32 => (Unsigned, 4, None),
            TypeTag::NativeInt64 => (Signed, 8, None),
            TypeTag::NativeUint64 => (Unsigned, 8, None),
            TypeTag::NativeFloat => (Float, 4, None),
            TypeTag::NativeDouble => (Float, 8, None),
        }
    }

    pub fn is_native(self) -> bool {
        self.layout().2.is_none()
    }

    /// Bytes per element.
    pub fn size(self) -> u32 {
        self.layout().1
    }

    /// The container datatype this tag describes. Native tags take the byte
    /// order of the machine.
    pub fn to_datatype(self) -> Datatype {
        let (class, size, order) = self.layout();
        let order = order.unwrap_or(ByteOrder::NATIVE);
        match class {
            Class::Signed => Datatype::fixed(size, true, order),
            Class::Unsigned => Datatype::fixed(size, false, order),
            Class::Float => Datatype::float(size, order),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (class, size, order) = self.layout();
        let prefix = match (class, order) {
            (Class::Float, Some(_)) => "ieee_f",
            (Class::Signed, Some(_)) => "std_i",
            (Class::Unsigned, Some(_)) => "std_u",
            (Class::Float, None) => "native_f",
            (Class::Signed, None) => "native_i",
            (Class::Unsigned, None) => "native_u",
        };
        let suffix = match order {
            Some(ByteOrder::BigEndian) => "be",
            Some(ByteOrder::LittleEndian) => "le",
            None => "",
        };
        write!(f, "{prefix}{}{suffix}", size * 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_disk_tag_maps_to_a_native_tag() {
        let disk: Vec<_> = TypeTag::ALL.iter().copied().filter(|t| !t.is_native()).collect();
        assert_eq!(disk.len(), 20);
        let mut natives = HashSet::new();
        for tag in disk {
            let native = lookup_native_type(tag);
            assert!(native.is_native(), "{tag} mapped to {native}");
            assert_eq!(native.size(), tag.size());
            natives.insert(native);
        }
        assert_eq!(natives.len(), 10);
    }

    #[test]
    fn native_tags_map_to_themselves() {
        for tag in TypeTag::ALL.iter().copied().filter(|t| t.is_native()) {
            assert_eq!(lookup_native_type(tag), tag);
        }
    }

    #[test]
    fn both_byte_orders_share_a_native_tag() {
        assert_eq!(lookup_native_type(TypeTag::StdI32Be), TypeTag::NativeInt32);
        assert_eq!(lookup_native_type(TypeTag::StdI32Le), TypeTag::NativeInt32);
        assert_eq!(lookup_native_type(TypeTag::IeeeF64Be), TypeTag::NativeDouble);
        assert_eq!(lookup_native_type(TypeTag::StdU8Le), TypeTag::NativeUint8);
    }

    #[test]
    fn datatypes() {
        assert_eq!(TypeTag::StdI32Le.to_datatype(), Datatype::i32_le());
        assert_eq!(TypeTag::IeeeF32Le.to_datatype(), Datatype::f32_le());
        assert_eq!(TypeTag::IeeeF64Le.to_datatype(), Datatype::f64_le());
        assert_eq!(
            TypeTag::StdU16Be.to_datatype(),
            Datatype::fixed(2, false, ByteOrder::BigEndian)
        );
        assert_eq!(
            TypeTag::NativeDouble.to_datatype(),
            Datatype::float(8, ByteOrder::NATIVE)
        );
    }

    #[test]
    fn display() {
        assert_eq!(TypeTag::StdI32Le.to_string(), "std_i32le");
        assert_eq!(TypeTag::IeeeF64Be.to_string(), "ieee_f64be");
        assert_eq!(TypeTag::NativeUint16.to_string(), "native_u16");
    }
}
