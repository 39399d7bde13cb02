//! Torrent registry state, owned by the actor.

use std::sync::Arc;

use super::commands::{
    PeerHandoff, TorrentEntry, TorrentIdentifier, TorrentListing, TorrentState, TrackerSession,
};
use crate::config::{IdentityPolicy, UndertowConfig};
use crate::torrent::{
    AnnounceRequest, InfoHash, MetainfoParser, ParsedTorrent, PeerId, TorrentError,
    TrackerClient, TrackerManager,
};

/// Ordered set of registered torrents.
///
/// Ids are 1-based positions in registration order and stay dense: removing
/// a torrent shifts every later torrent down by one. Every operation either
/// completes or leaves the registry exactly as it was.
pub struct TorrentRegistry {
    config: UndertowConfig,
    parser: MetainfoParser,
    trackers: TrackerManager,
    entries: Vec<TorrentEntry>,
}

impl TorrentRegistry {
    pub fn new(config: UndertowConfig, client: Arc<dyn TrackerClient>) -> Self {
        let trackers = TrackerManager::new(client, config.network.failover);
        Self {
            config,
            parser: MetainfoParser::new(),
            trackers,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a torrent from raw `.torrent` bytes.
    ///
    /// Decodes, validates, checks for duplicates, generates a peer identity
    /// and announces with failover, in that order. The entry is stored in
    /// the `Stopped` state only after every step succeeded.
    ///
    /// # Errors
    ///
    /// - `TorrentError::MalformedEncoding` / `InvalidMetainfo` - If the data is not a valid torrent
    /// - `TorrentError::DuplicateTorrent` - If an entry with the same identity exists
    /// - `TorrentError::IncompleteLengthInfo` - If the torrent has no payload
    /// - `TorrentError::NoReachableTracker` - If no announce URL produced a peer list
    pub async fn add_torrent_data(&mut self, data: &[u8]) -> Result<TorrentListing, TorrentError> {
        let ParsedTorrent {
            metainfo,
            info_hash,
        } = self.parser.parse_torrent_data(data)?;

        if let Some(existing) = self.find_duplicate(metainfo.name(), &info_hash) {
            return Err(TorrentError::DuplicateTorrent {
                name: existing.name().to_string(),
                info_hash: existing.info_hash,
            });
        }

        let peer_id = PeerId::generate(self.config.torrent.client_id);
        let request = AnnounceRequest::build(&metainfo, info_hash, peer_id, 0, 0)?
            .with_port(self.config.network.listen_port)
            .with_compact(self.config.network.request_compact);

        let urls = metainfo.tracker_urls(self.config.network.tier_policy);
        let outcome = self.trackers.announce_with_failover(&urls, &request).await?;
        let (tracker, peers) = TrackerSession::from_outcome(outcome);

        tracing::info!(
            "Added torrent '{}' ({}) with {} peers from {}",
            metainfo.name(),
            info_hash,
            peers.len(),
            tracker.tracker_url
        );

        self.entries.push(TorrentEntry {
            metainfo,
            info_hash,
            peer_id,
            tracker,
            peers,
            state: TorrentState::Stopped,
        });

        let id = self.entries.len();
        Ok(TorrentListing::from_entry(id, &self.entries[id - 1]))
    }

    /// Removes one torrent and returns its final listing.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - If nothing matches `identifier`
    pub fn remove(&mut self, identifier: &TorrentIdentifier) -> Result<TorrentListing, TorrentError> {
        let position = self.position(identifier)?;
        let entry = self.entries.remove(position);
        tracing::info!("Removed torrent '{}' ({})", entry.name(), entry.info_hash);
        Ok(TorrentListing::from_entry(position + 1, &entry))
    }

    /// Display rows in registration order.
    pub fn list(&self) -> Vec<TorrentListing> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| TorrentListing::from_entry(index + 1, entry))
            .collect()
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - If nothing matches `identifier`
    pub fn get(&self, identifier: &TorrentIdentifier) -> Result<&TorrentEntry, TorrentError> {
        let position = self.position(identifier)?;
        Ok(&self.entries[position])
    }

    /// Moves a torrent to `Started`. Starting a started torrent is a no-op.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - If nothing matches `identifier`
    pub fn start(&mut self, identifier: &TorrentIdentifier) -> Result<TorrentListing, TorrentError> {
        self.transition(identifier, TorrentState::Started)
    }

    /// Moves a torrent to `Stopped`. Stopping a stopped torrent is a no-op.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - If nothing matches `identifier`
    pub fn stop(&mut self, identifier: &TorrentIdentifier) -> Result<TorrentListing, TorrentError> {
        self.transition(identifier, TorrentState::Stopped)
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - If nothing matches `identifier`
    pub fn handoff(&self, identifier: &TorrentIdentifier) -> Result<PeerHandoff, TorrentError> {
        self.get(identifier).map(TorrentEntry::handoff)
    }

    fn transition(
        &mut self,
        identifier: &TorrentIdentifier,
        state: TorrentState,
    ) -> Result<TorrentListing, TorrentError> {
        let position = self.position(identifier)?;
        let entry = &mut self.entries[position];
        if entry.state != state {
            tracing::info!("Torrent '{}' {} -> {}", entry.name(), entry.state, state);
            entry.state = state;
        }
        Ok(TorrentListing::from_entry(position + 1, entry))
    }

    fn position(&self, identifier: &TorrentIdentifier) -> Result<usize, TorrentError> {
        let position = match identifier {
            TorrentIdentifier::Index(index) => index
                .checked_sub(1)
                .filter(|position| *position < self.entries.len()),
            TorrentIdentifier::InfoHash(info_hash) => self
                .entries
                .iter()
                .position(|entry| entry.info_hash == *info_hash),
            TorrentIdentifier::NamePrefix(prefix) if prefix.is_empty() => None,
            TorrentIdentifier::NamePrefix(prefix) => self
                .entries
                .iter()
                .position(|entry| entry.name().starts_with(prefix.as_str())),
        };

        position.ok_or_else(|| TorrentError::TorrentNotFound {
            identifier: identifier.to_string(),
        })
    }

    fn find_duplicate(&self, name: &str, info_hash: &InfoHash) -> Option<&TorrentEntry> {
        self.entries
            .iter()
            .find(|entry| match self.config.torrent.identity {
                IdentityPolicy::Name => entry.name() == name,
                IdentityPolicy::InfoHash => entry.info_hash == *info_hash,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierPolicy;
    use crate::engine::test_mocks::{MockTrackerClient, sample_torrent};
    use crate::torrent::TrackerError;

    fn registry_with(mock: &Arc<MockTrackerClient>, config: UndertowConfig) -> TorrentRegistry {
        TorrentRegistry::new(config, mock.clone())
    }

    fn healthy_mock(urls: &[&str]) -> Arc<MockTrackerClient> {
        let mock = Arc::new(MockTrackerClient::new());
        for url in urls {
            mock.succeed(url, MockTrackerClient::response_with_peers(2));
        }
        mock
    }

    #[tokio::test]
    async fn test_add_registers_stopped_entry_with_peers() {
        let mock = healthy_mock(&["http://t/a"]);
        let mut registry = registry_with(&mock, UndertowConfig::default());

        let listing = registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/a", &[]))
            .await
            .unwrap();

        assert_eq!(listing.id, 1);
        assert_eq!(listing.name, "alpha");
        assert_eq!(listing.state, TorrentState::Stopped);
        assert_eq!(listing.peer_count, 2);

        let entry = registry.get(&TorrentIdentifier::Index(1)).unwrap();
        assert_eq!(&entry.peer_id.as_bytes()[..8], b"-UT0001-");
        assert_eq!(entry.tracker.tracker_url, "http://t/a");

        let request = &mock.requests()[0];
        assert_eq!(request.left, 16384);
        assert_eq!(request.port, 6881);
        assert_eq!(request.peer_id, entry.peer_id);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_and_registry_unchanged() {
        let mock = healthy_mock(&["http://t/a", "http://t/b"]);
        let mut registry = registry_with(&mock, UndertowConfig::default());

        registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/a", &[]))
            .await
            .unwrap();
        let before = registry.list();

        // Same name, different announce URL and therefore different bytes.
        let result = registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/b", &[]))
            .await;

        assert!(matches!(result, Err(TorrentError::DuplicateTorrent { ref name, .. }) if name == "alpha"));
        assert_eq!(registry.list(), before);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_info_hash_identity_policy() {
        let mock = healthy_mock(&["http://t/a", "http://t/b"]);
        let mut config = UndertowConfig::default();
        config.torrent.identity = IdentityPolicy::InfoHash;
        let mut registry = registry_with(&mock, config);

        registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/a", &[]))
            .await
            .unwrap();

        // Same info dictionary under a different tracker is the same torrent.
        let result = registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/b", &[]))
            .await;
        assert!(matches!(result, Err(TorrentError::DuplicateTorrent { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_no_entry() {
        let mock = Arc::new(MockTrackerClient::new());
        mock.fail("http://t/a", TrackerError::Rejected {
            reason: "unregistered".to_string(),
        });
        let mut registry = registry_with(&mock, UndertowConfig::default());

        let unreachable = registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/a", &[]))
            .await;
        assert!(matches!(
            unreachable,
            Err(TorrentError::NoReachableTracker { ref failures }) if failures.len() == 1
        ));

        let malformed = registry.add_torrent_data(b"d8:announce").await;
        assert!(matches!(malformed, Err(TorrentError::MalformedEncoding(_))));

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failover_follows_tier_policy() {
        let tiers: &[&[&str]] = &[&["http://t/a", "http://t/a2"], &["http://t/b"]];

        let mock = Arc::new(MockTrackerClient::new());
        mock.succeed("http://t/a2", MockTrackerClient::response_with_peers(1));
        mock.succeed("http://t/b", MockTrackerClient::response_with_peers(4));

        let mut registry = registry_with(&mock, UndertowConfig::default());
        let listing = registry
            .add_torrent_data(&sample_torrent("first", "http://t/a", tiers))
            .await
            .unwrap();
        assert_eq!(listing.peer_count, 4);
        assert_eq!(mock.calls(), vec!["http://t/a", "http://t/b"]);

        let mut config = UndertowConfig::default();
        config.network.tier_policy = TierPolicy::EveryUrl;
        let mut registry = registry_with(&mock, config);
        let listing = registry
            .add_torrent_data(&sample_torrent("every", "http://t/a", tiers))
            .await
            .unwrap();
        assert_eq!(listing.peer_count, 1);

        let entry = registry.get(&TorrentIdentifier::Index(1)).unwrap();
        assert_eq!(entry.tracker.tracker_url, "http://t/a2");
        assert_eq!(entry.tracker.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_renumbers_and_matches_prefix() {
        let mock = healthy_mock(&["http://t/a"]);
        let mut registry = registry_with(&mock, UndertowConfig::default());
        for name in ["ubuntu-24.04", "debian-12", "ubuntu-22.04"] {
            registry
                .add_torrent_data(&sample_torrent(name, "http://t/a", &[]))
                .await
                .unwrap();
        }

        let removed = registry
            .remove(&TorrentIdentifier::parse("ubuntu"))
            .unwrap();
        assert_eq!(removed.name, "ubuntu-24.04");
        assert_eq!(removed.id, 1);

        let rows: Vec<String> = registry.list().iter().map(ToString::to_string).collect();
        assert_eq!(rows, vec!["1. debian-12", "2. ubuntu-22.04"]);

        let removed = registry.remove(&TorrentIdentifier::Index(2)).unwrap();
        assert_eq!(removed.name, "ubuntu-22.04");

        assert!(matches!(
            registry.remove(&TorrentIdentifier::Index(2)),
            Err(TorrentError::TorrentNotFound { .. })
        ));
        assert!(matches!(
            registry.remove(&TorrentIdentifier::Index(0)),
            Err(TorrentError::TorrentNotFound { .. })
        ));
        assert!(matches!(
            registry.remove(&TorrentIdentifier::NamePrefix(String::new())),
            Err(TorrentError::TorrentNotFound { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_and_handoff() {
        let mock = healthy_mock(&["http://t/a"]);
        let mut registry = registry_with(&mock, UndertowConfig::default());
        let listing = registry
            .add_torrent_data(&sample_torrent("alpha", "http://t/a", &[]))
            .await
            .unwrap();
        let by_hash = TorrentIdentifier::InfoHash(listing.info_hash);

        assert_eq!(registry.start(&by_hash).unwrap().state, TorrentState::Started);
        assert_eq!(registry.start(&by_hash).unwrap().state, TorrentState::Started);
        assert_eq!(registry.stop(&by_hash).unwrap().state, TorrentState::Stopped);

        let handoff = registry.handoff(&by_hash).unwrap();
        assert_eq!(handoff.info_hash, listing.info_hash);
        assert_eq!(handoff.total_length, 16384);
        assert_eq!(handoff.piece_hashes, vec![[0xabu8; 20]]);
        assert_eq!(handoff.peers.len(), 2);
    }
}
