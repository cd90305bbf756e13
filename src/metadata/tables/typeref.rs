use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `TypeRef` row (ECMA-335 II.22.38).
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// 1-based row id
    pub rid: u32,
    /// Metadata token of the row
    pub token: Token,
    /// Enclosing scope; a `TypeRef` here means a nested type
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::from_parts(Self::TABLE.token_type(), rid),
            resolution_scope: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::ResolutionScope,
            )?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted_short() {
        #[rustfmt::skip]
        let data = vec![
            0x0B, 0x00, // resolution_scope: TypeRef row 2
            0x02, 0x02, // type_name
            0x03, 0x03, // type_namespace
        ];

        let sizes = TableInfo::new_test(&[(TableId::TypeRef, 4)], false, false, false);
        let mut offset = 0;
        let row = TypeRefRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 6);
        assert_eq!(row.token, Token(0x01000001));
        assert_eq!(row.resolution_scope.tag, TableId::TypeRef);
        assert_eq!(row.resolution_scope.row, 2);
        assert_eq!(row.type_name, 0x0202);
        assert_eq!(row.type_namespace, 0x0303);
    }

    #[test]
    fn crafted_long() {
        #[rustfmt::skip]
        let data = vec![
            0x02, 0x00, 0x00, 0x00, // resolution_scope: AssemblyRef row 0 (null)
            0x02, 0x02, 0x02, 0x02, // type_name
            0x03, 0x03, 0x03, 0x03, // type_namespace
        ];

        let sizes = TableInfo::new_test(&[(TableId::AssemblyRef, u32::from(u16::MAX) + 3)], true, true, true);
        let mut offset = 0;
        let row = TypeRefRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 12);
        assert_eq!(row.resolution_scope.tag, TableId::AssemblyRef);
        assert!(row.resolution_scope.is_null());
        assert_eq!(row.type_name, 0x0202_0202);
        assert_eq!(row.type_namespace, 0x0303_0303);
    }
}
