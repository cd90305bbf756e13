use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfo},
    Error::OutOfBounds,
    Result,
};

/// A row type that can be parsed from the tables stream.
pub trait RowReadable: Sized {
    /// The table this row type belongs to.
    const TABLE: TableId;

    /// Read one row at `offset`, advancing it by the row size.
    ///
    /// ## Arguments
    /// * 'data'    - The table data, starting at the first row
    /// * 'offset'  - Read position, advanced past the row
    /// * 'rid'     - 1-based row id of the row being read
    /// * 'sizes'   - Column widths of this image
    ///
    /// # Errors
    /// Returns an error if the row is truncated or holds an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;
}

/// A typed view over the rows of one metadata table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: &'a TableInfo,
    _marker: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a table view. `data` must start at the first row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the rows it should
    /// hold, or [`crate::Error::NotSupported`] if the row layout is unknown.
    pub fn new(data: &'a [u8], row_count: u32, sizes: &'a TableInfo) -> Result<Self> {
        let row_size = sizes.row_size(T::TABLE).ok_or(crate::Error::NotSupported)?;
        let needed = u64::from(row_count) * u64::from(row_size);
        if needed > data.len() as u64 {
            return Err(OutOfBounds);
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            sizes,
            _marker: PhantomData,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Size of one row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Read the row with the given 1-based id.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for `rid == 0` or `rid > row_count`.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(OutOfBounds);
        }

        let mut offset = (rid as usize - 1) * self.row_size as usize;
        T::row_read(self.data, &mut offset, rid, self.sizes)
    }

    /// Iterate all rows in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        (1..=self.row_count).map(move |rid| self.get(rid))
    }
}
