//! BitTorrent HTTP tracker communication.
//!
//! Announce URL construction, response decoding (dictionary, compact and
//! `peers6` peer lists), the reqwest-backed client and multi-URL failover.

pub mod client;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod types;

// Re-export public API
pub use client::HttpTrackerClient;
pub use error::{AnnounceFailure, TrackerError};
pub use manager::{AnnounceOutcome, TrackerManager};
pub use types::{AnnounceRequest, AnnounceResponse, PeerAddress, TrackerClient, TrackerResponse};
