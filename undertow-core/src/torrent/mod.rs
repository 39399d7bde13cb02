//! BitTorrent metadata handling: bencode codec, metainfo extraction, peer
//! identity and HTTP tracker negotiation.

pub mod bencode;
pub mod parsing;
pub mod peer_id;
pub mod tracker;

use std::fmt;

pub use parsing::{
    FileEntry, Info, Metainfo, MetainfoError, MetainfoParser, ParsedTorrent, extract_metainfo,
};
pub use peer_id::PeerId;
pub use tracker::{
    AnnounceFailure, AnnounceOutcome, AnnounceRequest, AnnounceResponse, HttpTrackerClient,
    PeerAddress, TrackerClient, TrackerError, TrackerManager,
};

use self::bencode::BencodeError;

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte SHA-1 hash of the info dictionary from a torrent file.
/// Used to uniquely identify torrents across the BitTorrent network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates InfoHash from 20-byte SHA-1 hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Returns reference to underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parses the 40-character hex form, either case.
    ///
    /// # Errors
    ///
    /// - `hex::FromHexError` - If the input is not exactly 40 hex digits
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let mut hash = [0u8; 20];
        hex::decode_to_slice(text, &mut hash)?;
        Ok(Self(hash))
    }

    /// Percent-encoded raw bytes for a tracker query string.
    pub fn url_encoded(&self) -> String {
        urlencoding::encode_binary(&self.0).into_owned()
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Which step of torrent handling an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Parse,
    Validate,
    Announce,
    Registry,
    Io,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorStage::Parse => "parse",
            ErrorStage::Validate => "validate",
            ErrorStage::Announce => "announce",
            ErrorStage::Registry => "registry",
            ErrorStage::Io => "io",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during torrent operations.
///
/// Every variant is a plain value; none of them leave the registry changed.
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    #[error("malformed bencode: {0}")]
    MalformedEncoding(#[from] BencodeError),

    #[error("invalid metainfo: {0}")]
    InvalidMetainfo(#[from] MetainfoError),

    #[error("torrent '{name}' has no usable length information")]
    IncompleteLengthInfo { name: String },

    #[error("tracker {url} failed: {error}")]
    Tracker { url: String, error: TrackerError },

    #[error("no reachable tracker ({} attempted)", .failures.len())]
    NoReachableTracker { failures: Vec<AnnounceFailure> },

    #[error("torrent '{name}' ({info_hash}) is already registered")]
    DuplicateTorrent { name: String, info_hash: InfoHash },

    #[error("no torrent matches '{identifier}'")]
    TorrentNotFound { identifier: String },

    #[error("torrent registry has shut down")]
    EngineShutdown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TorrentError {
    pub fn stage(&self) -> ErrorStage {
        match self {
            TorrentError::MalformedEncoding(_) => ErrorStage::Parse,
            TorrentError::InvalidMetainfo(_) | TorrentError::IncompleteLengthInfo { .. } => {
                ErrorStage::Validate
            }
            TorrentError::Tracker { .. }
            | TorrentError::NoReachableTracker { .. }
            | TorrentError::Http(_) => ErrorStage::Announce,
            TorrentError::DuplicateTorrent { .. }
            | TorrentError::TorrentNotFound { .. }
            | TorrentError::EngineShutdown => ErrorStage::Registry,
            TorrentError::Io(_) => ErrorStage::Io,
        }
    }

    /// Returns a user-facing message naming the failed stage.
    ///
    /// For `NoReachableTracker` every per-URL failure follows on its own
    /// line, in the order the URLs were tried.
    pub fn user_message(&self) -> String {
        let mut message = format!("{} failed: {}", self.stage(), self);
        if let TorrentError::NoReachableTracker { failures } = self {
            for (position, failure) in failures.iter().enumerate() {
                message.push_str(&format!("\n  {}. {}", position + 1, failure));
            }
        }
        message
    }
}
