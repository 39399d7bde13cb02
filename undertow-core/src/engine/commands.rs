//! Command and record types for the torrent registry actor.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::torrent::{
    AnnounceFailure, AnnounceOutcome, InfoHash, Metainfo, PeerAddress, PeerId, TorrentError,
};

/// Commands that can be sent to the registry actor.
///
/// Each command carries a oneshot responder; the actor handles one command
/// at a time, so mutations and reads never interleave.
pub enum RegistryCommand {
    /// Parse, announce and register raw `.torrent` bytes.
    AddTorrent {
        data: Vec<u8>,
        responder: oneshot::Sender<Result<TorrentListing, TorrentError>>,
    },
    /// Remove one torrent; later ids shift down by one.
    RemoveTorrent {
        identifier: TorrentIdentifier,
        responder: oneshot::Sender<Result<TorrentListing, TorrentError>>,
    },
    /// Snapshot of every registered torrent, in registration order.
    ListTorrents {
        responder: oneshot::Sender<Vec<TorrentListing>>,
    },
    /// Full record of one torrent.
    GetTorrent {
        identifier: TorrentIdentifier,
        responder: oneshot::Sender<Result<TorrentEntry, TorrentError>>,
    },
    StartTorrent {
        identifier: TorrentIdentifier,
        responder: oneshot::Sender<Result<TorrentListing, TorrentError>>,
    },
    StopTorrent {
        identifier: TorrentIdentifier,
        responder: oneshot::Sender<Result<TorrentListing, TorrentError>>,
    },
    /// Data handed to the peer-wire layer.
    Handoff {
        identifier: TorrentIdentifier,
        responder: oneshot::Sender<Result<PeerHandoff, TorrentError>>,
    },
    /// Stop the actor after acknowledging.
    Shutdown { responder: oneshot::Sender<()> },
}

/// Lifecycle state of a registered torrent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TorrentState {
    #[default]
    Stopped,
    Started,
}

impl fmt::Display for TorrentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentState::Stopped => write!(f, "stopped"),
            TorrentState::Started => write!(f, "started"),
        }
    }
}

/// Result of the announce performed when the torrent was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSession {
    /// URL that produced the peer list
    pub tracker_url: String,
    /// Seconds until the tracker expects the next announce
    pub interval: u32,
    pub min_interval: Option<u32>,
    pub tracker_id: Option<String>,
    pub complete: Option<u32>,
    pub incomplete: Option<u32>,
    pub warning: Option<String>,
    /// URLs that failed before `tracker_url` answered
    pub failures: Vec<AnnounceFailure>,
    pub announced_at: DateTime<Utc>,
}

impl TrackerSession {
    /// Splits an announce outcome into session data and the peer list.
    pub(crate) fn from_outcome(outcome: AnnounceOutcome) -> (Self, Vec<PeerAddress>) {
        let AnnounceOutcome {
            tracker_url,
            response,
            failures,
        } = outcome;

        let session = Self {
            tracker_url,
            interval: response.interval,
            min_interval: response.min_interval,
            tracker_id: response.tracker_id,
            complete: response.complete,
            incomplete: response.incomplete,
            warning: response.warning,
            failures,
            announced_at: Utc::now(),
        };
        (session, response.peers)
    }
}

/// One registered torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentEntry {
    pub metainfo: Metainfo,
    pub info_hash: InfoHash,
    /// Identity generated for this torrent when it was added
    pub peer_id: PeerId,
    pub tracker: TrackerSession,
    pub peers: Vec<PeerAddress>,
    pub state: TorrentState,
}

impl TorrentEntry {
    pub fn name(&self) -> &str {
        self.metainfo.name()
    }

    pub fn handoff(&self) -> PeerHandoff {
        PeerHandoff {
            info_hash: self.info_hash,
            total_length: self.metainfo.info.total_length(),
            piece_hashes: self.metainfo.info.pieces().to_vec(),
            peers: self.peers.clone(),
        }
    }
}

/// Display row for one registered torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentListing {
    /// 1-based position in registration order
    pub id: usize,
    pub name: String,
    pub info_hash: InfoHash,
    pub state: TorrentState,
    pub peer_count: usize,
}

impl TorrentListing {
    pub(crate) fn from_entry(id: usize, entry: &TorrentEntry) -> Self {
        Self {
            id,
            name: entry.name().to_string(),
            info_hash: entry.info_hash,
            state: entry.state,
            peer_count: entry.peers.len(),
        }
    }
}

impl fmt::Display for TorrentListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id, self.name)
    }
}

/// Everything the peer-wire layer needs to start transferring a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerHandoff {
    pub info_hash: InfoHash,
    pub total_length: u64,
    pub piece_hashes: Vec<[u8; 20]>,
    pub peers: Vec<PeerAddress>,
}

/// How a caller refers to a registered torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentIdentifier {
    /// 1-based position as shown by `list`
    Index(usize),
    InfoHash(InfoHash),
    /// First torrent, in registration order, whose name starts with this
    NamePrefix(String),
}

impl TorrentIdentifier {
    /// Interprets user input: a decimal number is an index, 40 hex digits
    /// are an info-hash, anything else is a name prefix.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if !input.is_empty()
            && input.bytes().all(|byte| byte.is_ascii_digit())
            && let Ok(index) = input.parse()
        {
            return TorrentIdentifier::Index(index);
        }
        if input.len() == 40
            && let Ok(info_hash) = InfoHash::from_hex(input)
        {
            return TorrentIdentifier::InfoHash(info_hash);
        }
        TorrentIdentifier::NamePrefix(input.to_string())
    }
}

impl From<&str> for TorrentIdentifier {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl fmt::Display for TorrentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentIdentifier::Index(index) => write!(f, "#{index}"),
            TorrentIdentifier::InfoHash(info_hash) => write!(f, "{info_hash}"),
            TorrentIdentifier::NamePrefix(prefix) => write!(f, "{prefix}"),
        }
    }
}
