//! Validation failures raised while projecting a decoded tree onto `Metainfo`.

/// Reason a decoded `.torrent` dictionary was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetainfoError {
    #[error("torrent root must be a dictionary, found {found}")]
    RootNotDictionary { found: &'static str },

    #[error("missing required key '{key}'")]
    MissingKey { key: &'static str },

    #[error("key '{key}' must be {expected}, found {found}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("info dictionary contains both 'length' and 'files'")]
    ConflictingFileMode,

    #[error("info dictionary contains neither 'length' nor 'files'")]
    MissingFileMode,

    #[error("pieces length {length} is not a multiple of 20")]
    TruncatedPieces { length: usize },

    #[error("piece length must be positive, found {value}")]
    NonPositivePieceLength { value: i64 },

    #[error("key '{key}' must not be negative, found {value}")]
    NegativeLength { key: &'static str, value: i64 },

    #[error("total length of all files exceeds the supported range")]
    TotalLengthOverflow,

    #[error("key '{key}' is not valid UTF-8")]
    InvalidUtf8 { key: &'static str },

    #[error("file entry {index}: {source}")]
    InvalidFileEntry {
        index: usize,
        #[source]
        source: Box<MetainfoError>,
    },
}
