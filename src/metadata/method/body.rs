use crate::{
    file::io::read_le,
    metadata::method::{MethodBodyFlags, SectionFlags},
    Error::OutOfBounds,
    Result,
};

/// The header of a method body (ECMA-335 II.25.4).
///
/// Only the header is described here; the code that follows is decoded into instructions
/// by [`crate::assembly::decode_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBodyHeader {
    /// Size of the IL code in bytes
    pub size_code: usize,
    /// Size of the header in bytes (1 for tiny headers)
    pub size_header: usize,
    /// Token of the local variable signature, 0 if none
    pub local_var_sig_token: u32,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// `true` for a fat header
    pub is_fat: bool,
    /// `true` if locals are zero-initialized
    pub is_init_local: bool,
    /// `true` if exception handling sections follow the code
    pub is_exception_data: bool,
}

impl MethodBodyHeader {
    /// Parse a method body header and check that the declared code fits in `data`.
    ///
    /// ## Arguments
    /// * 'data' - The body, starting at its first header byte
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for empty data or an unknown header format and
    /// [`crate::Error::OutOfBounds`] if the code runs past `data`.
    pub fn from(data: &[u8]) -> Result<MethodBodyHeader> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_00000011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBodyHeader {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: 8,
                    is_fat: false,
                    is_init_local: false,
                    is_exception_data: false,
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < 12 {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;

                let size_header = ((first_duo >> 12) * 4) as usize;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat method header declares {} bytes",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                match size_code.checked_add(size_header) {
                    Some(end) if end <= data.len() => {}
                    _ => return Err(OutOfBounds),
                }

                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000111111111111_u16);

                Ok(MethodBodyHeader {
                    size_code,
                    size_header,
                    local_var_sig_token: read_le::<u32>(&data[8..])?,
                    max_stack: read_le::<u16>(&data[2..])? as usize,
                    is_fat: true,
                    is_init_local: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    is_exception_data: flags_header.contains(MethodBodyFlags::MORE_SECTS)
                        && Self::has_eh_section(data, size_header + size_code),
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Header for a body that only exists in memory.
    #[must_use]
    pub fn synthetic(size_code: usize) -> MethodBodyHeader {
        MethodBodyHeader {
            size_code,
            size_header: if size_code < 64 { 1 } else { 12 },
            local_var_sig_token: 0,
            max_stack: 8,
            is_fat: size_code >= 64,
            is_init_local: false,
            is_exception_data: false,
        }
    }

    /// Total bytes of header and code.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_header + self.size_code
    }

    fn has_eh_section(data: &[u8], code_end: usize) -> bool {
        let cursor = (code_end + 3) & !3;
        data.get(cursor)
            .map(|flags| SectionFlags::from_bits_truncate(*flags).contains(SectionFlags::EHTABLE))
            .unwrap_or(false)
    }
}
