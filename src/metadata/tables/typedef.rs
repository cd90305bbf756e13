use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `TypeDef` row (ECMA-335 II.22.37).
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// 1-based row id
    pub rid: u32,
    /// Metadata token of the row
    pub token: Token,
    /// `TypeAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Base type
    pub extends: CodedIndex,
    /// First row of this type's run in `Field` (or `FieldPtr`)
    pub field_list: u32,
    /// First row of this type's run in `MethodDef` (or `MethodPtr`)
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE.token_type(), rid),
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(
                data,
                offset,
                sizes.table_index_bytes(TableId::Field) == 4,
            )?,
            method_list: read_le_at_dyn(
                data,
                offset,
                sizes.table_index_bytes(TableId::MethodDef) == 4,
            )?,
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
            0x01, 0x00, 0x10, 0x00, // flags
            0x42, 0x00, // type_name
            0x43, 0x00, // type_namespace
            0x05, 0x00, // extends: TypeRef row 1
            0x01, 0x00, // field_list
            0x04, 0x00, // method_list
        ];

        let sizes = TableInfo::new_test(
            &[(TableId::TypeDef, 2), (TableId::MethodDef, 6)],
            false,
            false,
            false,
        );
        let mut offset = 0;
        let row = TypeDefRaw::row_read(&data, &mut offset, 2, &sizes).unwrap();

        assert_eq!(offset, 14);
        assert_eq!(row.token, Token(0x02000002));
        assert_eq!(row.flags, 0x0010_0001);
        assert_eq!(row.type_name, 0x42);
        assert_eq!(row.type_namespace, 0x43);
        assert_eq!(row.extends.tag, TableId::TypeRef);
        assert_eq!(row.extends.row, 1);
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 4);
    }
}
