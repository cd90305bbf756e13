use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `MethodPtr` row: one level of indirection into `MethodDef`, emitted in
/// uncompressed (`#-`) table streams.
#[derive(Clone, Debug)]
pub struct MethodPtrRaw {
    /// 1-based row id
    pub rid: u32,
    /// Metadata token of the row
    pub token: Token,
    /// The `MethodDef` row this entry stands for
    pub method: u32,
}

impl RowReadable for MethodPtrRaw {
    const TABLE: TableId = TableId::MethodPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodPtrRaw {
            rid,
            token: Token::from_parts(Self::TABLE.token_type(), rid),
            method: read_le_at_dyn(
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
    fn crafted() {
        let data = vec![0x03, 0x00, 0x01, 0x00];
        let sizes = TableInfo::new_test(&[(TableId::MethodDef, 3)], false, false, false);

        let mut offset = 2;
        let row = MethodPtrRaw::row_read(&data, &mut offset, 2, &sizes).unwrap();

        assert_eq!(offset, 4);
        assert_eq!(row.token, Token(0x05000002));
        assert_eq!(row.method, 1);
    }
}
