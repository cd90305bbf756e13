use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The coded index kinds used by the tables this crate reads (ECMA-335 II.24.2.6).
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, EnumCount)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec`
    TypeDefOrRef,
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef` or `TypeSpec`
    MemberRefParent,
}

impl CodedIndexType {
    /// Candidate tables in tag order.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
        }
    }

    /// Number of low bits that hold the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let count = self.tables().len() as u32;
        (u32::BITS - (count - 1).leading_zeros()) as u8
    }
}

/// A decoded coded index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodedIndex {
    /// The table the index points into
    pub tag: TableId,
    /// 1-based row, 0 for a null reference
    pub row: u32,
    /// Token equivalent of `tag` and `row`
    pub token: Token,
}

impl CodedIndex {
    /// Create a coded index from its parts.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag.token_type(), row),
        }
    }

    /// Read and decode a coded index of kind `ci_type` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data is truncated or the tag is invalid.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = read_le_at_dyn(data, offset, info.coded_index_bytes(ci_type) == 4)?;
        let (tag, row) = info.decode_coded_index(coded_index, ci_type)?;

        Ok(CodedIndex::new(tag, row))
    }

    /// `true` if the index references no row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
    }

    #[test]
    fn read_member_ref_parent() {
        let info = TableInfo::new_test(&[(TableId::TypeRef, 10)], false, false, false);

        // TypeRef row 2: (2 << 3) | 1
        let data = [0x11, 0x00];
        let mut offset = 0;
        let index =
            CodedIndex::read(&data, &mut offset, &info, CodedIndexType::MemberRefParent).unwrap();

        assert_eq!(offset, 2);
        assert_eq!(index.tag, TableId::TypeRef);
        assert_eq!(index.row, 2);
        assert_eq!(index.token, Token(0x01000002));
        assert!(!index.is_null());
    }

    #[test]
    fn read_invalid_tag() {
        let info = TableInfo::new_test(&[(TableId::TypeRef, 10)], false, false, false);

        let data = [0x07, 0x00];
        let mut offset = 0;
        assert!(
            CodedIndex::read(&data, &mut offset, &info, CodedIndexType::MemberRefParent).is_err()
        );
    }
}
