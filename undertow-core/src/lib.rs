//! Undertow Core - torrent intake for a BitTorrent client
//!
//! This crate turns raw `.torrent` bytes into registered torrents: a
//! byte-exact bencode codec, metainfo extraction and info-hash computation,
//! HTTP tracker announces with failover, and an actor-owned registry that
//! hands info-hash, piece hashes and peers to a peer-wire layer.

pub mod config;
pub mod engine;
pub mod torrent;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::UndertowConfig;
pub use engine::{RegistryHandle, TorrentIdentifier, spawn_http_registry, spawn_registry};
pub use torrent::{ErrorStage, InfoHash, TorrentError};
