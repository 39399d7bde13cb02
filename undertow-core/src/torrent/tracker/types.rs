//! Core types for BitTorrent tracker communication

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use bytes::Bytes;

use super::error::TrackerError;
use super::protocol::constants::DEFAULT_PORT;
use crate::torrent::{InfoHash, Metainfo, PeerId, TorrentError};

/// Tracker announce request.
///
/// Contains client statistics and torrent information sent to tracker
/// during announce operations to report progress and request peer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    /// Unique identifier for the torrent being announced
    pub info_hash: InfoHash,
    /// Client's unique 20-byte identifier
    pub peer_id: PeerId,
    /// TCP port reported to the tracker
    pub port: u16,
    /// Total bytes uploaded to other peers
    pub uploaded: u64,
    /// Total bytes downloaded from other peers
    pub downloaded: u64,
    /// Bytes remaining to download
    pub left: u64,
    /// Ask for the compact peer list
    pub compact: bool,
}

impl AnnounceRequest {
    /// Builds a request for `metainfo`, deriving `left` from its total length.
    ///
    /// # Errors
    ///
    /// - `TorrentError::IncompleteLengthInfo` - If the torrent reports a total length of zero
    pub fn build(
        metainfo: &Metainfo,
        info_hash: InfoHash,
        peer_id: PeerId,
        uploaded: u64,
        downloaded: u64,
    ) -> Result<Self, TorrentError> {
        let total = metainfo.info.total_length();
        if total == 0 {
            return Err(TorrentError::IncompleteLengthInfo {
                name: metainfo.name().to_string(),
            });
        }

        Ok(Self {
            info_hash,
            peer_id,
            port: DEFAULT_PORT,
            uploaded,
            downloaded,
            left: total.saturating_sub(downloaded),
            compact: false,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

/// Decoded tracker reply, before failure reasons are turned into errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerResponse {
    Failure { reason: String },
    Success(AnnounceResponse),
}

/// Successful tracker announce response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceResponse {
    /// Seconds until next announce request should be sent
    pub interval: u32,
    /// Minimum allowed interval between announces
    pub min_interval: Option<u32>,
    /// Tracker-specific identifier for subsequent requests
    pub tracker_id: Option<String>,
    /// Number of seeders in the swarm
    pub complete: Option<u32>,
    /// Number of leechers in the swarm
    pub incomplete: Option<u32>,
    /// Non-fatal message from the tracker
    pub warning: Option<String>,
    /// Candidate peers in tracker order
    pub peers: Vec<PeerAddress>,
}

/// One peer returned by a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    /// Only present in the dictionary peer model
    pub peer_id: Option<Bytes>,
    /// Address literal or host name
    pub ip: String,
    pub port: u16,
}

impl PeerAddress {
    /// Socket address when `ip` is a literal address rather than a host name.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.ip
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "{}:{}", self.ip, self.port),
        }
    }
}

/// Abstract tracker transport.
///
/// One call is one attempt against one URL; failover across URLs lives in
/// `TrackerManager`.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Announces to `announce_url` and returns the decoded peer list.
    ///
    /// # Errors
    ///
    /// - `TrackerError::UnsupportedScheme` - If the URL is not http or https
    /// - `TrackerError::Unreachable` / `Timeout` / `HttpStatus` - If the transport failed
    /// - `TrackerError::Rejected` - If the tracker answered with a failure reason
    /// - `TrackerError::MalformedResponse` - If the body is not a valid announce response
    async fn announce(
        &self,
        announce_url: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TrackerError>;
}
