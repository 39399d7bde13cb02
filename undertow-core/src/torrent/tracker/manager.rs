//! Failover across the announce URLs of one torrent.

use std::sync::Arc;

use futures::StreamExt;

use super::error::{AnnounceFailure, TrackerError};
use super::types::{AnnounceRequest, AnnounceResponse, TrackerClient};
use crate::config::FailoverStrategy;
use crate::torrent::TorrentError;

/// Result of a successful failover run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceOutcome {
    /// URL whose response was accepted
    pub tracker_url: String,
    pub response: AnnounceResponse,
    /// URLs that failed before the accepted response, in list order
    pub failures: Vec<AnnounceFailure>,
}

/// Drives a `TrackerClient` across an ordered list of announce URLs.
///
/// The first successful response wins; peer lists are never merged across
/// trackers.
#[derive(Clone)]
pub struct TrackerManager {
    client: Arc<dyn TrackerClient>,
    strategy: FailoverStrategy,
}

impl TrackerManager {
    pub fn new(client: Arc<dyn TrackerClient>, strategy: FailoverStrategy) -> Self {
        Self { client, strategy }
    }

    pub fn strategy(&self) -> FailoverStrategy {
        self.strategy
    }

    /// Announces to a single URL without failover.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Tracker` - If the attempt failed for any reason
    pub async fn announce_one(
        &self,
        url: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TorrentError> {
        self.client
            .announce(url, request)
            .await
            .map_err(|error| TorrentError::Tracker {
                url: url.to_string(),
                error,
            })
    }

    /// Tries `urls` until one returns a peer list.
    ///
    /// Transport failures, rejections and malformed responses all move on
    /// to the next URL. Failures seen before the winner are reported in the
    /// outcome; failures arriving after it are discarded.
    ///
    /// # Errors
    ///
    /// - `TorrentError::NoReachableTracker` - If every URL failed, or `urls` is empty
    pub async fn announce_with_failover(
        &self,
        urls: &[String],
        request: &AnnounceRequest,
    ) -> Result<AnnounceOutcome, TorrentError> {
        tracing::info!(
            "Announcing to {} trackers for torrent {}",
            urls.len(),
            request.info_hash
        );

        match self.strategy {
            FailoverStrategy::Sequential => self.announce_sequential(urls, request).await,
            FailoverStrategy::Concurrent { max_in_flight } => {
                self.announce_concurrent(urls, request, max_in_flight.max(1))
                    .await
            }
        }
    }

    async fn announce_sequential(
        &self,
        urls: &[String],
        request: &AnnounceRequest,
    ) -> Result<AnnounceOutcome, TorrentError> {
        let mut failures = Vec::new();

        for url in urls {
            match self.client.announce(url, request).await {
                Ok(response) => return Ok(accepted(url, response, failures)),
                Err(error) => failures.push(rejected(url, error)),
            }
        }

        Err(TorrentError::NoReachableTracker { failures })
    }

    /// Keeps up to `max_in_flight` attempts running, started in list order.
    /// Returning drops the stream, which cancels attempts still in flight.
    async fn announce_concurrent(
        &self,
        urls: &[String],
        request: &AnnounceRequest,
        max_in_flight: usize,
    ) -> Result<AnnounceOutcome, TorrentError> {
        let client = self.client.clone();
        let request = request.clone();
        let mut attempts = futures::stream::iter(urls.to_vec().into_iter().enumerate())
            .map(move |(index, url)| {
                let client = client.clone();
                let request = request.clone();
                async move {
                    let result = client.announce(&url, &request).await;
                    (index, url, result)
                }
            })
            .buffer_unordered(max_in_flight);

        let mut failures: Vec<(usize, AnnounceFailure)> = Vec::new();
        while let Some((index, url, result)) = attempts.next().await {
            match result {
                Ok(response) => {
                    failures.sort_by_key(|(index, _)| *index);
                    let failures = failures.into_iter().map(|(_, failure)| failure).collect();
                    return Ok(accepted(&url, response, failures));
                }
                Err(error) => failures.push((index, rejected(&url, error))),
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        Err(TorrentError::NoReachableTracker {
            failures: failures.into_iter().map(|(_, failure)| failure).collect(),
        })
    }
}

fn accepted(url: &str, response: AnnounceResponse, failures: Vec<AnnounceFailure>) -> AnnounceOutcome {
    tracing::info!(
        "Tracker {} responded with {} peers, interval {}s",
        url,
        response.peers.len(),
        response.interval
    );
    AnnounceOutcome {
        tracker_url: url.to_string(),
        response,
        failures,
    }
}

fn rejected(url: &str, error: TrackerError) -> AnnounceFailure {
    tracing::warn!("Tracker {} failed: {}", url, error);
    AnnounceFailure {
        url: url.to_string(),
        error,
    }
}
