use strum::{EnumCount, IntoEnumIterator};

use crate::{
    metadata::tables::{CodedIndexType, TableId},
    Error::OutOfBounds,
    Result,
};

/// Row count of one table and the number of bits needed to index it.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to represent `rows`
    pub bits: u8,
    /// `true` if a plain index into this table needs 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive index width information from a row count.
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Column widths of the tables stream: row counts for all 64 table slots plus heap index
/// sizes.
#[derive(Clone, Debug)]
pub struct TableInfo {
    rows: [TableRowInfo; 64],
    coded_indexes: [u8; CodedIndexType::COUNT],
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Build from the raw row counts (indexed by table number) and the `HeapSizes` byte.
    #[must_use]
    pub fn new(row_counts: &[u32; 64], heap_size_flags: u8) -> Self {
        let mut table_info = TableInfo {
            rows: [TableRowInfo::default(); 64],
            coded_indexes: [0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        for (slot, rows) in row_counts.iter().enumerate() {
            table_info.rows[slot] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    #[cfg(test)]
    pub(crate) fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut row_counts = [0u32; 64];
        for (table, rows) in valid_tables {
            row_counts[*table as usize] = *rows;
        }

        let flags = u8::from(large_str) | (u8::from(large_guid) << 1) | (u8::from(large_blob) << 2);
        TableInfo::new(&row_counts, flags)
    }

    /// Split a raw coded index into its table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the tag selects no table.
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tables = coded_index_type.tables();
        let tag_bits = coded_index_type.tag_bits();
        let tag_mask = (1 << tag_bits) - 1;

        let tag = value & tag_mask;
        let index = value >> tag_bits;

        if tag as usize >= tables.len() {
            return Err(OutOfBounds);
        }

        Ok((tables[tag as usize], index))
    }

    /// Row information of a table.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Row count of a table.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u32 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u32 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u32 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// `true` if `#Strings` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// `true` if `#Blob` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a plain index into `table_id`.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u32 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of the given kind.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u32 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Size in bytes of one row of `table`, for the tables that precede and include
    /// `MemberRef`. Returns `None` for tables whose layout is not known here.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> Option<u32> {
        let size = match table {
            TableId::Module => 2 + self.str_bytes() + (self.guid_bytes() * 3),
            TableId::TypeRef => {
                self.coded_index_bytes(CodedIndexType::ResolutionScope) + (self.str_bytes() * 2)
            }
            TableId::TypeDef => {
                4 + (self.str_bytes() * 2)
                    + self.coded_index_bytes(CodedIndexType::TypeDefOrRef)
                    + self.table_index_bytes(TableId::Field)
                    + self.table_index_bytes(TableId::MethodDef)
            }
            TableId::FieldPtr => self.table_index_bytes(TableId::Field),
            TableId::Field => 2 + self.str_bytes() + self.blob_bytes(),
            TableId::MethodPtr => self.table_index_bytes(TableId::MethodDef),
            TableId::MethodDef => {
                8 + self.str_bytes() + self.blob_bytes() + self.table_index_bytes(TableId::Param)
            }
            TableId::ParamPtr => self.table_index_bytes(TableId::Param),
            TableId::Param => 4 + self.str_bytes(),
            TableId::InterfaceImpl => {
                self.table_index_bytes(TableId::TypeDef)
                    + self.coded_index_bytes(CodedIndexType::TypeDefOrRef)
            }
            TableId::MemberRef => {
                self.coded_index_bytes(CodedIndexType::MemberRefParent)
                    + self.str_bytes()
                    + self.blob_bytes()
            }
            TableId::ModuleRef | TableId::TypeSpec | TableId::AssemblyRef => return None,
        };

        Some(size)
    }

    fn calculate_coded_index_bits(&mut self) {
        for ci_type in CodedIndexType::iter() {
            let max_bits = ci_type
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[ci_type as usize] = max_bits + ci_type.tag_bits();
        }
    }
}
