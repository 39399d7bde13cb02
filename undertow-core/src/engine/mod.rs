//! Torrent registry actor.
//!
//! `TorrentRegistry` owns the registered torrents; the actor serializes
//! access to it and `RegistryHandle` is the cloneable async front end.

pub mod actor;
pub mod commands;
pub mod core;
pub mod handle;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

pub use actor::{spawn_http_registry, spawn_registry};
pub use commands::{
    PeerHandoff, RegistryCommand, TorrentEntry, TorrentIdentifier, TorrentListing, TorrentState,
    TrackerSession,
};
pub use handle::RegistryHandle;

pub use self::core::TorrentRegistry;
