use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `MethodDef` row (ECMA-335 II.22.26).
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// 1-based row id
    pub rid: u32,
    /// Metadata token of the row
    pub token: Token,
    /// RVA of the method body, 0 if there is none
    pub rva: u32,
    /// `MethodImplAttributes`
    pub impl_flags: u32,
    /// `MethodAttributes`
    pub flags: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the signature
    pub signature: u32,
    /// First row of this method's run in `Param`
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::from_parts(Self::TABLE.token_type(), rid),
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: u32::from(read_le_at::<u16>(data, offset)?),
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(
                data,
                offset,
                sizes.table_index_bytes(TableId::Param) == 4,
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
            0x50, 0x20, 0x00, 0x00, // rva
            0x00, 0x00, // impl_flags
            0x96, 0x00, // flags
            0x2A, 0x00, // name
            0x01, 0x00, // signature
            0x01, 0x00, // param_list
        ];

        let sizes = TableInfo::new_test(&[(TableId::MethodDef, 1)], false, false, false);
        let mut offset = 0;
        let row = MethodDefRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 14);
        assert_eq!(row.token, Token(0x06000001));
        assert_eq!(row.rva, 0x2050);
        assert_eq!(row.impl_flags, 0);
        assert_eq!(row.flags, 0x96);
        assert_eq!(row.name, 0x2A);
        assert_eq!(row.signature, 1);
        assert_eq!(row.param_list, 1);
    }

    #[test]
    fn crafted_long() {
        #[rustfmt::skip]
        let data = vec![
            0x50, 0x20, 0x00, 0x00, // rva
            0x03, 0x00, // impl_flags
            0x96, 0x00, // flags
            0x2A, 0x00, 0x00, 0x00, // name
            0x01, 0x00, 0x00, 0x00, // signature
            0x01, 0x00, 0x00, 0x00, // param_list
        ];

        let sizes = TableInfo::new_test(
            &[(TableId::MethodDef, 1), (TableId::Param, u32::from(u16::MAX) + 2)],
            true,
            true,
            true,
        );
        let mut offset = 0;
        let row = MethodDefRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(offset, 20);
        assert_eq!(row.impl_flags, 3);
        assert_eq!(row.param_list, 1);
    }
}
