//! Typed torrent descriptor produced by the extractor.

use chrono::{DateTime, Utc};

use crate::config::TierPolicy;
use crate::torrent::InfoHash;

/// Validated projection of a `.torrent` file.
///
/// Built once per add operation and never mutated afterwards. Anything the
/// projection drops, such as unknown keys inside `info`, still contributes to
/// the info-hash because hashing happens on the decoded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    /// Primary tracker URL
    pub announce: String,
    /// First URL of every `announce-list` tier, in tier order
    pub announce_list: Vec<String>,
    /// Every `announce-list` URL grouped by tier
    pub announce_tiers: Vec<Vec<String>>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub info: Info,
}

impl Metainfo {
    /// Torrent name from the info dictionary.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Ordered announce URLs to try: the primary first, then the
    /// `announce-list` URLs selected by `policy`. Duplicates and empty
    /// strings are dropped, keeping the first occurrence.
    pub fn tracker_urls(&self, policy: TierPolicy) -> Vec<String> {
        let listed: Box<dyn Iterator<Item = &String>> = match policy {
            TierPolicy::FirstPerTier => Box::new(self.announce_list.iter()),
            TierPolicy::EveryUrl => Box::new(self.announce_tiers.iter().flatten()),
        };

        let mut urls: Vec<String> = Vec::new();
        for url in std::iter::once(&self.announce).chain(listed) {
            if !url.is_empty() && !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        urls
    }
}

/// Piece layout and file structure of a torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Info {
    SingleFile {
        name: String,
        piece_length: u64,
        pieces: Vec<[u8; 20]>,
        length: u64,
    },
    MultiFile {
        name: String,
        piece_length: u64,
        pieces: Vec<[u8; 20]>,
        files: Vec<FileEntry>,
    },
}

impl Info {
    pub fn name(&self) -> &str {
        match self {
            Info::SingleFile { name, .. } | Info::MultiFile { name, .. } => name,
        }
    }

    pub fn piece_length(&self) -> u64 {
        match self {
            Info::SingleFile { piece_length, .. } | Info::MultiFile { piece_length, .. } => {
                *piece_length
            }
        }
    }

    /// SHA-1 hash of every piece, in piece order.
    pub fn pieces(&self) -> &[[u8; 20]] {
        match self {
            Info::SingleFile { pieces, .. } | Info::MultiFile { pieces, .. } => pieces,
        }
    }

    pub fn piece_count(&self) -> usize {
        self.pieces().len()
    }

    /// Total payload size: `length`, or the sum of all file lengths.
    ///
    /// Extraction guarantees the sum fits in an `i64`.
    pub fn total_length(&self) -> u64 {
        match self {
            Info::SingleFile { length, .. } => *length,
            Info::MultiFile { files, .. } => files.iter().map(|file| file.length).sum(),
        }
    }

    pub fn is_multi_file(&self) -> bool {
        matches!(self, Info::MultiFile { .. })
    }

    /// Files in the torrent. Single-file torrents yield one entry named
    /// after the torrent.
    pub fn files(&self) -> Vec<FileEntry> {
        match self {
            Info::SingleFile { name, length, .. } => vec![FileEntry {
                length: *length,
                path: name.clone(),
            }],
            Info::MultiFile { files, .. } => files.clone(),
        }
    }
}

/// One file of a multi-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub length: u64,
    /// Path segments joined with `/`, relative to the torrent directory
    pub path: String,
}

/// Extraction result: the descriptor plus its protocol identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTorrent {
    pub metainfo: Metainfo,
    pub info_hash: InfoHash,
}
