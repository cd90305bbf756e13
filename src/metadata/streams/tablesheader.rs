//! The `#~` / `#-` tables stream header (ECMA-335 II.24.2.6).

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo},
    Error::OutOfBounds,
    Result,
};

/// `HeapSizes` bit announcing four extra bytes after the row counts.
const EXTRA_DATA: u8 = 0x40;

/// Parsed header of the tables stream with row offsets for the leading tables.
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Raw `HeapSizes` flags
    pub heap_sizes: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Column widths derived from the row counts
    pub info: TableInfo,
    data: &'a [u8],
    /// Start offset (inside `data`) of every table up to and including `MemberRef`
    table_offsets: [Option<usize>; TableId::MemberRef as usize + 1],
}

impl<'a> TablesHeader<'a> {
    /// Parse the tables stream header and locate the tables up to `MemberRef`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data or tables that overrun the
    /// stream, and [`crate::Error::Malformed`] for an empty table set.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let major_version = read_le::<u8>(&data[4..])?;
        let minor_version = read_le::<u8>(&data[5..])?;
        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let mut offset = 24_usize;
        let mut row_counts = [0u32; 64];
        for (slot, rows) in row_counts.iter_mut().enumerate() {
            if valid & (1u64 << slot) != 0 {
                *rows = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes & EXTRA_DATA != 0 {
            offset += 4;
        }

        let info = TableInfo::new(&row_counts, heap_sizes);

        let mut table_offsets = [None; TableId::MemberRef as usize + 1];
        for table in [
            TableId::Module,
            TableId::TypeRef,
            TableId::TypeDef,
            TableId::FieldPtr,
            TableId::Field,
            TableId::MethodPtr,
            TableId::MethodDef,
            TableId::ParamPtr,
            TableId::Param,
            TableId::InterfaceImpl,
            TableId::MemberRef,
        ] {
            let rows = info.rows(table);
            if rows == 0 {
                continue;
            }

            let row_size = info.row_size(table).ok_or(crate::Error::NotSupported)?;
            let Some(size) = (rows as usize).checked_mul(row_size as usize) else {
                return Err(OutOfBounds);
            };
            let Some(end) = offset.checked_add(size) else {
                return Err(OutOfBounds);
            };
            if end > data.len() {
                return Err(OutOfBounds);
            }

            table_offsets[table as usize] = Some(offset);
            offset = end;
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            info,
            data,
            table_offsets,
        })
    }

    /// Row count of a table (0 if absent).
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.info.rows(table)
    }

    /// `true` if the table is present with at least one row.
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.info.rows(table) > 0
    }

    /// Typed access to one of the leading tables. Returns `None` if the table has no rows
    /// or lies beyond `MemberRef`.
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> Option<MetadataTable<'_, T>> {
        let start = (*self.table_offsets.get(T::TABLE as usize)?)?;
        MetadataTable::new(&self.data[start..], self.info.rows(T::TABLE), &self.info).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{MemberRefRaw, TypeRefRaw};

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x00, // reserved
            0x02, 0x00,             // version
            0x00,                   // heap sizes
            0x01,                   // reserved
            0x03, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // valid: Module, TypeRef, MemberRef
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // sorted
            0x01, 0x00, 0x00, 0x00, // Module rows
            0x01, 0x00, 0x00, 0x00, // TypeRef rows
            0x01, 0x00, 0x00, 0x00, // MemberRef rows
            // Module
            0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
            // TypeRef
            0x00, 0x00, 0x05, 0x00, 0x07, 0x00,
            // MemberRef
            0x09, 0x00, 0x0B, 0x00, 0x01, 0x00,
        ];

        let header = TablesHeader::from(&data).unwrap();

        assert_eq!(header.major_version, 2);
        assert_eq!(header.minor_version, 0);
        assert_eq!(header.rows(TableId::Module), 1);
        assert!(header.has_table(TableId::MemberRef));
        assert!(!header.has_table(TableId::TypeDef));

        let type_refs = header.table::<TypeRefRaw>().unwrap();
        assert_eq!(type_refs.row_count(), 1);
        let type_ref = type_refs.get(1).unwrap();
        assert_eq!(type_ref.type_name, 5);
        assert_eq!(type_ref.type_namespace, 7);
        assert!(type_refs.get(2).is_err());

        let member_refs = header.table::<MemberRefRaw>().unwrap();
        let member_ref = member_refs.get(1).unwrap();
        assert_eq!(member_ref.class.tag, TableId::TypeRef);
        assert_eq!(member_ref.class.row, 1);
        assert_eq!(member_ref.name, 0x0B);
    }

    #[test]
    fn row_counts_of_unknown_tables_are_skipped() {
        let mut data = vec![0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01];
        // valid: TypeRef and CustomAttribute (0x0C)
        data.extend_from_slice(&((1u64 << 0x01) | (1u64 << 0x0C)).to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&9u32.to_le_bytes());
        data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x03, 0x00]);

        let header = TablesHeader::from(&data).unwrap();
        let type_ref = header.table::<TypeRefRaw>().unwrap().get(1).unwrap();
        assert_eq!(type_ref.type_name, 2);
        assert_eq!(type_ref.type_namespace, 3);
    }

    #[test]
    fn truncated_tables() {
        let mut data = vec![0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01];
        data.extend_from_slice(&(1u64 << 0x01).to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0x00, 0x00, 0x02, 0x00, 0x03, 0x00]);

        assert!(TablesHeader::from(&data).is_err());
    }
}
