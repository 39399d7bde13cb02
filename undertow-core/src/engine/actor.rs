//! Actor implementation for the torrent registry.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::commands::RegistryCommand;
use super::core::TorrentRegistry;
use super::handle::RegistryHandle;
use crate::config::UndertowConfig;
use crate::torrent::{HttpTrackerClient, TorrentError, TrackerClient};

/// Spawns the registry actor and returns its handle.
///
/// The actor owns the registry and processes commands one at a time, so
/// concurrent callers never observe a half-applied mutation. The actor stops
/// when every handle is dropped or `RegistryHandle::shutdown` is called.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use std::sync::Arc;
///
/// use undertow_core::config::UndertowConfig;
/// use undertow_core::engine::spawn_registry;
/// use undertow_core::torrent::HttpTrackerClient;
///
/// let config = UndertowConfig::default();
/// let client = HttpTrackerClient::new(&config.network).unwrap();
/// let handle = spawn_registry(config, Arc::new(client));
/// # }
/// ```
pub fn spawn_registry(config: UndertowConfig, client: Arc<dyn TrackerClient>) -> RegistryHandle {
    let (sender, receiver) = mpsc::channel(100);
    let registry = TorrentRegistry::new(config, client);

    tokio::spawn(async move {
        run_actor_loop(registry, receiver).await;
    });

    RegistryHandle::new(sender)
}

/// Spawns the registry actor backed by the reqwest tracker client.
///
/// # Errors
///
/// - `TorrentError::Http` - If the HTTP client cannot be built
pub fn spawn_http_registry(config: UndertowConfig) -> Result<RegistryHandle, TorrentError> {
    let client = HttpTrackerClient::new(&config.network)?;
    Ok(spawn_registry(config, Arc::new(client)))
}

async fn run_actor_loop(
    mut registry: TorrentRegistry,
    mut receiver: mpsc::Receiver<RegistryCommand>,
) {
    tracing::debug!("Torrent registry actor started");

    while let Some(command) = receiver.recv().await {
        if !handle_command(&mut registry, command).await {
            break;
        }
    }

    tracing::debug!(
        "Torrent registry actor stopped with {} torrents",
        registry.len()
    );
}

/// Handles a single command. Returns false once the actor should stop.
async fn handle_command(registry: &mut TorrentRegistry, command: RegistryCommand) -> bool {
    match command {
        RegistryCommand::AddTorrent { data, responder } => {
            let result = registry.add_torrent_data(&data).await;
            let _ = responder.send(result);
        }

        RegistryCommand::RemoveTorrent {
            identifier,
            responder,
        } => {
            let _ = responder.send(registry.remove(&identifier));
        }

        RegistryCommand::ListTorrents { responder } => {
            let _ = responder.send(registry.list());
        }

        RegistryCommand::GetTorrent {
            identifier,
            responder,
        } => {
            let result = registry.get(&identifier).cloned();
            let _ = responder.send(result);
        }

        RegistryCommand::StartTorrent {
            identifier,
            responder,
        } => {
            let _ = responder.send(registry.start(&identifier));
        }

        RegistryCommand::StopTorrent {
            identifier,
            responder,
        } => {
            let _ = responder.send(registry.stop(&identifier));
        }

        RegistryCommand::Handoff {
            identifier,
            responder,
        } => {
            let _ = responder.send(registry.handoff(&identifier));
        }

        RegistryCommand::Shutdown { responder } => {
            tracing::debug!("Torrent registry actor shutting down");
            let _ = responder.send(());
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::FailoverStrategy;
    use crate::engine::TorrentIdentifier;
    use crate::torrent::TrackerError;
    use crate::engine::test_mocks::{MockTrackerClient, sample_torrent};

    fn spawn_with_mock() -> (RegistryHandle, Arc<MockTrackerClient>) {
        let mock = Arc::new(MockTrackerClient::new());
        mock.succeed("http://t/a", MockTrackerClient::response_with_peers(3));
        let handle = spawn_registry(UndertowConfig::for_testing(), mock.clone());
        (handle, mock)
    }

    #[tokio::test]
    async fn test_actor_add_list_remove() {
        let (handle, _mock) = spawn_with_mock();

        let listing = handle
            .add_torrent(sample_torrent("alpha", "http://t/a", &[]))
            .await
            .unwrap();
        assert_eq!(listing.id, 1);
        handle
            .add_torrent(sample_torrent("beta", "http://t/a", &[]))
            .await
            .unwrap();

        let names: Vec<String> = handle
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|listing| listing.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        handle.remove(TorrentIdentifier::Index(1)).await.unwrap();
        let entry = handle.get(TorrentIdentifier::Index(1)).await.unwrap();
        assert_eq!(entry.name(), "beta");
        assert_eq!(entry.peers.len(), 3);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_name_register_once() {
        let mock = Arc::new(MockTrackerClient::new());
        mock.succeed_after(
            "http://t/a",
            MockTrackerClient::response_with_peers(1),
            Duration::from_millis(10),
        );
        let handle = spawn_registry(UndertowConfig::for_testing(), mock);

        let first = handle.add_torrent(sample_torrent("same", "http://t/a", &[]));
        let second = handle.add_torrent(sample_torrent("same", "http://t/a", &[]));
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert_eq!(handle.list().await.unwrap().len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_failover_through_actor() {
        let mock = Arc::new(MockTrackerClient::new());
        mock.fail("http://t/dead", TrackerError::Unreachable {
            reason: "connection refused".to_string(),
        });
        mock.succeed_after(
            "http://t/live",
            MockTrackerClient::response_with_peers(4),
            Duration::from_millis(10),
        );

        let mut config = UndertowConfig::for_testing();
        config.network.failover = FailoverStrategy::Concurrent { max_in_flight: 2 };
        let handle = spawn_registry(config, mock);

        let listing = handle
            .add_torrent(sample_torrent(
                "gamma",
                "http://t/dead",
                &[&["http://t/dead"], &["http://t/live"]],
            ))
            .await
            .unwrap();
        assert_eq!(listing.peer_count, 4);

        let entry = handle.get(TorrentIdentifier::Index(1)).await.unwrap();
        assert_eq!(entry.tracker.tracker_url, "http://t/live");
        assert_eq!(entry.tracker.failures.len(), 1);
        assert_eq!(entry.tracker.failures[0].url, "http://t/dead");

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_fail() {
        let (handle, _mock) = spawn_with_mock();
        handle.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = handle.list().await;
        assert!(matches!(result, Err(TorrentError::EngineShutdown)));
    }

    #[tokio::test]
    async fn test_unknown_identifier_through_actor() {
        let (handle, _mock) = spawn_with_mock();

        let result = handle.start(TorrentIdentifier::parse("missing")).await;
        assert!(matches!(
            result,
            Err(TorrentError::TorrentNotFound { ref identifier }) if identifier == "missing"
        ));

        handle.shutdown().await.unwrap();
    }
}
