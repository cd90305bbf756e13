use crate::{file::io::read_le, Error::OutOfBounds, Result};

/// Stream names this crate understands. `#-` is the uncompressed tables stream.
pub const KNOWN_STREAMS: [&str; 6] = ["#Strings", "#US", "#Blob", "#GUID", "#~", "#-"];

/// One entry of the stream directory that follows the metadata root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header. The name is read up to its NUL terminator (32 bytes at most).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data, or
    /// [`crate::Error::Malformed`] if the name is not terminated within 32 bytes.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_bytes = &data[8..std::cmp::min(data.len(), 8 + 32)];
        let Some(name_end) = name_bytes.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Bytes this header occupies in the stream directory, including name padding.
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + (((self.name.len() + 1) + 3) & !3)
    }

    /// `true` for one of the [`KNOWN_STREAMS`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        KNOWN_STREAMS.contains(&self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parsed_header.header_size(), 12);
        assert!(parsed_header.is_known());
    }

    #[test]
    fn crafted_unknown_name() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x23, 0x4A, 0x75, 0x6E, 0x6B, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();
        assert_eq!(parsed_header.name, "#Junk");
        assert_eq!(parsed_header.header_size(), 16);
        assert!(!parsed_header.is_known());
    }

    #[test]
    fn crafted_invalid() {
        let mut header_bytes = vec![0x6C, 0x00, 0x00, 0x00, 0xA4, 0x45, 0x00, 0x00];
        header_bytes.extend_from_slice(&[0x41; 40]);

        if StreamHeader::from(&header_bytes).is_ok() {
            panic!("This should not be valid!")
        }

        if StreamHeader::from(&[0x00; 8]).is_ok() {
            panic!("This should not be valid!")
        }
    }
}
