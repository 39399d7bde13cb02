//! Entry point turning raw `.torrent` bytes into a `ParsedTorrent`.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::extract::extract_metainfo;
use super::types::ParsedTorrent;
use crate::torrent::TorrentError;
use crate::torrent::bencode;

/// Decodes and validates `.torrent` data.
///
/// Stateless; the byte-stream entry points exist so callers can hand over
/// whatever source they opened without buffering it themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetainfoParser;

impl MetainfoParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a complete `.torrent` file held in memory.
    ///
    /// # Errors
    ///
    /// - `TorrentError::MalformedEncoding` - If the bytes are not exactly one bencode value
    /// - `TorrentError::InvalidMetainfo` - If the decoded tree is not a valid torrent
    pub fn parse_torrent_data(&self, data: &[u8]) -> Result<ParsedTorrent, TorrentError> {
        let root = bencode::decode(data)?;
        Ok(extract_metainfo(&root)?)
    }

    /// Reads `reader` to the end and parses the result.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Io` - If reading fails
    /// - `TorrentError::MalformedEncoding` - If the bytes are not exactly one bencode value
    /// - `TorrentError::InvalidMetainfo` - If the decoded tree is not a valid torrent
    pub async fn parse_torrent_reader<R>(&self, mut reader: R) -> Result<ParsedTorrent, TorrentError>
    where
        R: AsyncRead + Unpin,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.parse_torrent_data(&data)
    }

    /// Convenience wrapper reading a `.torrent` file from disk.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Io` - If the file cannot be read
    /// - `TorrentError::MalformedEncoding` - If the bytes are not exactly one bencode value
    /// - `TorrentError::InvalidMetainfo` - If the decoded tree is not a valid torrent
    pub async fn parse_torrent_file(&self, path: &Path) -> Result<ParsedTorrent, TorrentError> {
        let data = tokio::fs::read(path).await?;
        self.parse_torrent_data(&data)
    }
}
