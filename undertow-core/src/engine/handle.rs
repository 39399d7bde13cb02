//! Handle for communicating with the torrent registry actor.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};

use super::commands::{
    PeerHandoff, RegistryCommand, TorrentEntry, TorrentIdentifier, TorrentListing,
};
use crate::torrent::TorrentError;

/// Cloneable async front end for the registry actor.
///
/// Every method sends one command and waits for its reply. If the actor has
/// stopped, methods return `TorrentError::EngineShutdown`.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Returns true while the actor still accepts commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Adds a torrent from raw `.torrent` bytes.
    ///
    /// # Errors
    ///
    /// - `TorrentError::MalformedEncoding` / `InvalidMetainfo` - Bad torrent data
    /// - `TorrentError::DuplicateTorrent` - Torrent already registered
    /// - `TorrentError::NoReachableTracker` - Every announce URL failed
    pub async fn add_torrent(&self, data: Vec<u8>) -> Result<TorrentListing, TorrentError> {
        self.request(|responder| RegistryCommand::AddTorrent { data, responder })
            .await?
    }

    /// Reads the whole stream, then adds it like `add_torrent`.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Io` - If reading fails
    /// - Any error from `add_torrent`
    pub async fn add_from_reader<R>(&self, mut reader: R) -> Result<TorrentListing, TorrentError>
    where
        R: AsyncRead + Unpin,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.add_torrent(data).await
    }

    /// # Errors
    ///
    /// - `TorrentError::Io` - If the file cannot be read
    /// - Any error from `add_torrent`
    pub async fn add_torrent_file(&self, path: &Path) -> Result<TorrentListing, TorrentError> {
        let data = tokio::fs::read(path).await?;
        self.add_torrent(data).await
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - Nothing matches `identifier`
    pub async fn remove(
        &self,
        identifier: TorrentIdentifier,
    ) -> Result<TorrentListing, TorrentError> {
        self.request(|responder| RegistryCommand::RemoveTorrent {
            identifier,
            responder,
        })
        .await?
    }

    /// # Errors
    ///
    /// - `TorrentError::EngineShutdown` - The actor has stopped
    pub async fn list(&self) -> Result<Vec<TorrentListing>, TorrentError> {
        self.request(|responder| RegistryCommand::ListTorrents { responder })
            .await
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - Nothing matches `identifier`
    pub async fn get(&self, identifier: TorrentIdentifier) -> Result<TorrentEntry, TorrentError> {
        self.request(|responder| RegistryCommand::GetTorrent {
            identifier,
            responder,
        })
        .await?
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - Nothing matches `identifier`
    pub async fn start(&self, identifier: TorrentIdentifier) -> Result<TorrentListing, TorrentError> {
        self.request(|responder| RegistryCommand::StartTorrent {
            identifier,
            responder,
        })
        .await?
    }

    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - Nothing matches `identifier`
    pub async fn stop(&self, identifier: TorrentIdentifier) -> Result<TorrentListing, TorrentError> {
        self.request(|responder| RegistryCommand::StopTorrent {
            identifier,
            responder,
        })
        .await?
    }

    /// Info-hash, total length, piece hashes and peers for the peer-wire layer.
    ///
    /// # Errors
    ///
    /// - `TorrentError::TorrentNotFound` - Nothing matches `identifier`
    pub async fn handoff(&self, identifier: TorrentIdentifier) -> Result<PeerHandoff, TorrentError> {
        self.request(|responder| RegistryCommand::Handoff {
            identifier,
            responder,
        })
        .await?
    }

    /// Stops the actor once every command queued before this one is done.
    ///
    /// # Errors
    ///
    /// - `TorrentError::EngineShutdown` - The actor had already stopped
    pub async fn shutdown(&self) -> Result<(), TorrentError> {
        self.request(|responder| RegistryCommand::Shutdown { responder })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, TorrentError> {
        let (responder, rx) = oneshot::channel();

        self.sender
            .send(command(responder))
            .await
            .map_err(|_| TorrentError::EngineShutdown)?;

        rx.await.map_err(|_| TorrentError::EngineShutdown)
    }
}
