//! The CLI header (ECMA-335 II.25.3.3) that anchors all managed metadata in a PE image.

use bitflags::bitflags;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

bitflags! {
    /// Runtime flags of the CLI header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CorFlags: u32 {
        /// Image contains IL only
        const ILONLY = 0x0000_0001;
        /// Image requires a 32-bit process
        const REQUIRED_32BIT = 0x0000_0002;
        /// Image is an IL library
        const IL_LIBRARY = 0x0000_0004;
        /// Image carries a strong name signature
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// Entry point is a native RVA, not a token
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Runtime tracks debug data
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// Image prefers a 32-bit process
        const PREFERRED_32BIT = 0x0002_0000;
    }
}

/// The 72-byte CLI header.
#[derive(Debug, Clone)]
pub struct Cor20Header {
    /// Size of the header in bytes
    pub cb: u32,
    /// Major runtime version required
    pub major_runtime_version: u16,
    /// Minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// Runtime flags, unknown bits preserved
    pub flags: u32,
    /// Entry point token or native RVA
    pub entry_point_token: u32,
    /// RVA of managed resources
    pub resource_rva: u32,
    /// Size of managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
    /// RVA of the vtable fixups
    pub vtable_fixups_rva: u32,
    /// Size of the vtable fixups
    pub vtable_fixups_size: u32,
}

impl Cor20Header {
    /// Parse the CLI header from the start of `data`.
    ///
    /// Only what is required to locate the metadata is validated. Reserved fields and
    /// unknown flag bits are accepted as-is.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data and [`crate::Error::Malformed`]
    /// for a header that cannot locate metadata.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb < 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected at least 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        if meta_data_rva == 0 {
            return Err(malformed_error!("Metadata RVA cannot be zero"));
        }

        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_size == 0 {
            return Err(malformed_error!("Metadata size cannot be zero"));
        } else if meta_data_size > 0x1000_0000 {
            return Err(malformed_error!(
                "Metadata size {} exceeds reasonable limit (256MB)",
                meta_data_size
            ));
        }

        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;
        let resource_rva = parser.read_le::<u32>()?;
        let resource_size = parser.read_le::<u32>()?;
        let strong_name_signature_rva = parser.read_le::<u32>()?;
        let strong_name_signature_size = parser.read_le::<u32>()?;

        // Code manager table, reserved
        parser.advance_by(8)?;

        let vtable_fixups_rva = parser.read_le::<u32>()?;
        let vtable_fixups_size = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
            vtable_fixups_rva,
            vtable_fixups_size,
        })
    }

    /// Known runtime flags; unknown bits are dropped.
    #[must_use]
    pub fn cor_flags(&self) -> CorFlags {
        CorFlags::from_bits_truncate(self.flags)
    }

    /// `true` if the image claims a strong name signature. Any byte edit invalidates it.
    #[must_use]
    pub fn is_strong_name_signed(&self) -> bool {
        self.cor_flags().contains(CorFlags::STRONG_NAME_SIGNED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(flags: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&72u32.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&5u16.to_le_bytes());
        data.extend_from_slice(&0x2050u32.to_le_bytes());
        data.extend_from_slice(&0x0300u32.to_le_bytes());
        data.extend_from_slice(&flags.to_le_bytes());
        data.extend_from_slice(&0x0600_0001u32.to_le_bytes());
        data.resize(72, 0);
        data
    }

    #[test]
    fn crafted() {
        let header = Cor20Header::read(&header_bytes(0x0002_0009)).unwrap();

        assert_eq!(header.cb, 72);
        assert_eq!(header.major_runtime_version, 2);
        assert_eq!(header.minor_runtime_version, 5);
        assert_eq!(header.meta_data_rva, 0x2050);
        assert_eq!(header.meta_data_size, 0x0300);
        assert_eq!(header.entry_point_token, 0x0600_0001);
        assert!(header.is_strong_name_signed());
        assert!(header.cor_flags().contains(CorFlags::PREFERRED_32BIT));
    }

    #[test]
    fn not_signed() {
        let header = Cor20Header::read(&header_bytes(0x0000_0001)).unwrap();
        assert!(!header.is_strong_name_signed());
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            Cor20Header::read(&[0u8; 40]),
            Err(crate::Error::OutOfBounds)
        ));

        let mut data = header_bytes(1);
        data[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(Cor20Header::read(&data).is_err());

        let mut data = header_bytes(1);
        data[0..4].copy_from_slice(&16u32.to_le_bytes());
        assert!(Cor20Header::read(&data).is_err());
    }
}
