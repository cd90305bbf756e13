//! The `#US` heap (ECMA-335 II.24.2.4).
//!
//! Each entry is a compressed byte length followed by UTF-16LE code units and one trailing
//! flag byte. `ldstr` operands are `0x70` tokens whose row is the byte offset of the entry.
//!
//! Besides reading, this module knows how to encode an entry so string literals can be
//! replaced in place: [`UserStrings::encode`] produces the canonical bytes and
//! [`UserStringEntry::slot_len`] tells how many bytes the original occupies.

use widestring::U16Str;

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// The `#US` heap of a metadata image.
pub struct UserStrings<'a> {
    data: &'a [u8],
}

/// A single raw `#US` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStringEntry<'a> {
    /// Offset of the entry inside the heap
    pub offset: usize,
    /// Size of the compressed length prefix
    pub prefix_len: usize,
    /// Code units plus the trailing flag byte, as declared by the prefix
    pub payload: &'a [u8],
}

impl UserStringEntry<'_> {
    /// Total number of heap bytes this entry occupies.
    #[must_use]
    pub fn slot_len(&self) -> usize {
        self.prefix_len + self.payload.len()
    }

    /// The UTF-16 code units, without the flag byte.
    #[must_use]
    pub fn units(&self) -> Vec<u16> {
        let char_bytes = self.payload.len() & !1;
        self.payload[..char_bytes]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

impl<'a> UserStrings<'a> {
    /// Wrap a `#US` heap. The first byte must be the empty entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the heap is empty or does not start with `0`.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(OutOfBounds);
        }

        Ok(UserStrings { data })
    }

    /// Size of the heap in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the heap has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the raw entry starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry exceeds the heap, or
    /// [`crate::Error::Malformed`] for an invalid length prefix.
    pub fn entry(&self, index: usize) -> Result<UserStringEntry<'a>> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let length = parser.read_compressed_uint()? as usize;
        let prefix_len = parser.pos();
        let payload = parser.read_bytes(length)?;

        Ok(UserStringEntry {
            offset: index,
            prefix_len,
            payload,
        })
    }

    /// Decode the string starting at `index`. Unpaired surrogates are replaced.
    ///
    /// # Errors
    /// Same as [`UserStrings::entry`].
    pub fn get(&self, index: usize) -> Result<String> {
        let entry = self.entry(index)?;
        Ok(U16Str::from_slice(&entry.units()).to_string_lossy())
    }

    /// Encode `value` as a complete `#US` entry: canonical compressed length, UTF-16LE code
    /// units and the trailing flag byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] if the string is too large for a heap entry.
    pub fn encode(value: &str) -> Result<Vec<u8>> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let length = units
            .len()
            .checked_mul(2)
            .and_then(|bytes| bytes.checked_add(1))
            .and_then(|bytes| u32::try_from(bytes).ok())
            .filter(|bytes| *bytes <= 0x1FFF_FFFF)
            .ok_or_else(|| crate::Error::Error("User string too long to encode".to_string()))?;

        let mut encoded = Vec::with_capacity(length as usize + 4);
        write_compressed_uint(length, &mut encoded);
        for unit in &units {
            encoded.extend_from_slice(&unit.to_le_bytes());
        }
        encoded.push(u8::from(needs_special_handling(&units)));

        Ok(encoded)
    }
}

/// Append the ECMA-335 compressed form of `value` (at most `0x1FFF_FFFF`).
pub fn write_compressed_uint(value: u32, out: &mut Vec<u8>) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(0x80 | (value >> 8) as u8);
        out.push(value as u8);
    } else {
        out.push(0xC0 | ((value >> 24) & 0x1F) as u8);
        out.push((value >> 16) as u8);
        out.push((value >> 8) as u8);
        out.push(value as u8);
    }
}

/// The `#US` trailing byte is 1 if any code unit has a non-zero high byte, or a low byte in
/// 0x01-0x08, 0x0E-0x1F, 0x27, 0x2D or 0x7F.
#[must_use]
pub fn needs_special_handling(units: &[u16]) -> bool {
    units.iter().any(|unit| {
        *unit > 0xFF || matches!(*unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
    })
}
