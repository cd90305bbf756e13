//! PE container access.
//!
//! [`File`] owns the raw bytes of an input image (memory-mapped from disk or held in a
//! buffer) together with the `goblin` view of its PE headers. Everything above this layer
//! works with file offsets obtained through [`File::rva_to_offset`] and never touches goblin
//! directly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilb64::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("sample.exe"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! println!("CLR header at 0x{:x} ({} bytes)", clr_offset, clr_size);
//! # Ok::<(), cilb64::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::PE;
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Raw byte source for a [`File`].
pub trait Backend: Send + Sync {
    /// Get a bounds-checked slice of the data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset + len` exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// The complete data.
    fn data(&self) -> &[u8];

    /// Total length of the data.
    fn len(&self) -> usize;
}

/// A loaded PE image that carries a CLR runtime header.
///
/// The parsed `goblin` structure borrows the backend, so the two live together in one
/// self-referencing struct.
#[self_referencing]
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Loads a PE file from the given path. The file is memory-mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is empty, is not a PE image, or has no
    /// CLR runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a PE file from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, is not a PE image, or has no CLR runtime
    /// header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let data = data.as_ref();
            match PE::parse(data.data()) {
                Ok(pe) => match &pe.header.optional_header {
                    Some(optional_header) => {
                        if optional_header
                            .data_directories
                            .get_clr_runtime_header()
                            .is_none()
                        {
                            Err(malformed_error!(
                                "File does not have a CLR runtime header directory"
                            ))
                        } else {
                            Ok(pe)
                        }
                    }
                    None => Err(malformed_error!("File does not have an OptionalHeader")),
                },
                Err(error) => Err(GoblinErr(error)),
            }
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the RVA and size of the CLR runtime header.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the directory is missing or empty.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            let Some(optional_header) = &pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            match optional_header.data_directories.get_clr_runtime_header() {
                Some(clr_dir) if clr_dir.virtual_address != 0 && clr_dir.size != 0 => {
                    Ok((clr_dir.virtual_address as usize, clr_dir.size as usize))
                }
                _ => Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                )),
            }
        })
    }

    /// Returns the complete raw data of the image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the raw data.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Converts a relative virtual address into a file offset using the section table.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps the RVA to initialized file data.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let span = if section.virtual_size == 0 {
                    section.size_of_raw_data
                } else {
                    section.virtual_size
                };

                let Some(section_max) = section.virtual_address.checked_add(span) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        span
                    ));
                };

                if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                    let delta = rva_u32 - section.virtual_address;
                    if delta >= section.size_of_raw_data {
                        return Err(malformed_error!(
                            "RVA 0x{:x} points into uninitialized section data",
                            rva
                        ));
                    }

                    return Ok(section.pointer_to_raw_data as usize + delta as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}
