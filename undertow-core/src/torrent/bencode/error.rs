//! Bencode grammar violations.

/// Error raised when input bytes do not form exactly one valid bencode value.
///
/// Every variant records the byte offset where decoding stopped so the
/// caller can point at the offending part of a `.torrent` file or tracker
/// response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BencodeError {
    #[error("unexpected end of input at offset {offset} while reading {context}")]
    UnexpectedEof {
        offset: usize,
        context: &'static str,
    },

    #[error("invalid integer at offset {offset}: {reason}")]
    InvalidInteger { offset: usize, reason: &'static str },

    #[error("invalid byte string length at offset {offset}: {reason}")]
    InvalidLength { offset: usize, reason: &'static str },

    #[error("unexpected byte 0x{byte:02x} at offset {offset} while reading {context}")]
    UnexpectedByte {
        offset: usize,
        byte: u8,
        context: &'static str,
    },

    #[error("dictionary key at offset {offset} is not a byte string")]
    NonStringKey { offset: usize },

    #[error("dictionary key at offset {offset} has no value")]
    MissingValue { offset: usize },

    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: usize },
}

impl BencodeError {
    /// Byte offset at which the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            BencodeError::UnexpectedEof { offset, .. }
            | BencodeError::InvalidInteger { offset, .. }
            | BencodeError::InvalidLength { offset, .. }
            | BencodeError::UnexpectedByte { offset, .. }
            | BencodeError::NonStringKey { offset }
            | BencodeError::MissingValue { offset }
            | BencodeError::TrailingData { offset } => *offset,
        }
    }
}
