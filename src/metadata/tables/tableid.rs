use strum::{Display, EnumCount, EnumIter};

/// Metadata tables this crate reads or sizes.
///
/// Only the tables up to `MemberRef` are ever parsed; the remaining ids are needed because
/// their row counts determine the width of coded indexes.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, EnumIter, EnumCount,
)]
pub enum TableId {
    /// `Module` (0x00)
    Module = 0x00,
    /// `TypeRef` (0x01)
    TypeRef = 0x01,
    /// `TypeDef` (0x02)
    TypeDef = 0x02,
    /// `FieldPtr` (0x03), uncompressed streams only
    FieldPtr = 0x03,
    /// `Field` (0x04)
    Field = 0x04,
    /// `MethodPtr` (0x05), uncompressed streams only
    MethodPtr = 0x05,
    /// `MethodDef` (0x06)
    MethodDef = 0x06,
    /// `ParamPtr` (0x07), uncompressed streams only
    ParamPtr = 0x07,
    /// `Param` (0x08)
    Param = 0x08,
    /// `InterfaceImpl` (0x09)
    InterfaceImpl = 0x09,
    /// `MemberRef` (0x0A)
    MemberRef = 0x0A,
    /// `ModuleRef` (0x1A)
    ModuleRef = 0x1A,
    /// `TypeSpec` (0x1B)
    TypeSpec = 0x1B,
    /// `AssemblyRef` (0x23)
    AssemblyRef = 0x23,
}

impl TableId {
    /// The table byte used in tokens.
    #[must_use]
    pub fn token_type(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn ids_are_sorted() {
        let ids: Vec<TableId> = TableId::iter().collect();
        let mut sorted = ids.clone();
        sorted.sort();

        assert_eq!(ids, sorted);
        assert_eq!(TableId::COUNT, 14);
        assert_eq!(TableId::MemberRef.token_type(), 0x0A);
        assert_eq!(TableId::TypeSpec.to_string(), "TypeSpec");
    }
}
