//! Base64 literal decoding.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

/// Why a literal could not be decoded. Recoverable; the literal is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The text is not standard padded base64
    #[error("Invalid Base64 - {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// The decoded bytes are not UTF-8
    #[error("Decoded bytes are not valid UTF-8 - {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Decode a base64 literal to text.
///
/// ASCII whitespace is ignored anywhere in the input, the rest must be standard alphabet
/// base64 with padding, and the bytes must form valid UTF-8.
///
/// # Errors
/// Returns [`DecodeError::InvalidBase64`] or [`DecodeError::InvalidUtf8`].
pub fn decode_base64_text(encoded: &str) -> Result<String, DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text() {
        assert_eq!(decode_base64_text("SGVsbG8=").unwrap(), "Hello");
        assert_eq!(decode_base64_text("").unwrap(), "");
        assert_eq!(decode_base64_text("w6lsw6h2ZQ==").unwrap(), "élève");
    }

    #[test]
    fn ignores_whitespace() {
        assert_eq!(decode_base64_text(" SGVs\r\nbG8=\t").unwrap(), "Hello");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_base64_text("not-base64!!"),
            Err(DecodeError::InvalidBase64(_))
        ));
        assert!(matches!(
            decode_base64_text("SGVsbG8"),
            Err(DecodeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        // 0xFF 0xFE
        assert!(matches!(
            decode_base64_text("//4="),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }
}
