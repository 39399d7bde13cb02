//! Scripted tracker client for exercising failover and the registry
//! without sockets.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::torrent::bencode::{self, Dictionary, Value};
use crate::torrent::tracker::{
    AnnounceRequest, AnnounceResponse, PeerAddress, TrackerClient, TrackerError,
};

/// Encodes a single-file torrent named `name` with one piece of 16 KiB.
///
/// `tiers` becomes `announce-list` when non-empty. Distinct names give
/// distinct info-hashes.
pub fn sample_torrent(name: &str, announce: &str, tiers: &[&[&str]]) -> Vec<u8> {
    let mut info = Dictionary::new();
    info.insert("length", 16384i64);
    info.insert("name", name);
    info.insert("piece length", 16384i64);
    info.insert("pieces", Value::Bytes(vec![0xabu8; 20].into()));

    let mut root = Dictionary::new();
    root.insert("announce", announce);
    if !tiers.is_empty() {
        let tiers = tiers
            .iter()
            .map(|tier| Value::List(tier.iter().map(|url| Value::string(url)).collect()))
            .collect::<Vec<_>>();
        root.insert("announce-list", tiers);
    }
    root.insert("info", info);

    bencode::encode(&Value::Dict(root))
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    result: Result<AnnounceResponse, TrackerError>,
    delay: Option<Duration>,
}

/// Tracker client answering from a per-URL script.
///
/// URLs without a script fail with `TrackerError::Unreachable`. Every call is
/// logged when it starts and again when it completes, so tests can tell
/// cancelled attempts from finished ones.
#[derive(Debug, Default)]
pub struct MockTrackerClient {
    replies: Mutex<HashMap<String, ScriptedReply>>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    requests: Mutex<Vec<AnnounceRequest>>,
}

impl MockTrackerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a success response with `count` distinct loopback peers.
    pub fn response_with_peers(count: usize) -> AnnounceResponse {
        AnnounceResponse {
            interval: 1800,
            min_interval: None,
            tracker_id: None,
            complete: None,
            incomplete: None,
            warning: None,
            peers: (0..count)
                .map(|index| PeerAddress {
                    peer_id: None,
                    ip: "127.0.0.1".to_string(),
                    port: 6881 + index as u16,
                })
                .collect(),
        }
    }

    pub fn succeed(&self, url: &str, response: AnnounceResponse) {
        self.script(url, Ok(response), None);
    }

    pub fn succeed_after(&self, url: &str, response: AnnounceResponse, delay: Duration) {
        self.script(url, Ok(response), Some(delay));
    }

    pub fn fail(&self, url: &str, error: TrackerError) {
        self.script(url, Err(error), None);
    }

    pub fn fail_after(&self, url: &str, error: TrackerError, delay: Duration) {
        self.script(url, Err(error), Some(delay));
    }

    /// URLs in the order announces were started.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// URLs in the order announces ran to completion.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<AnnounceRequest> {
        self.requests.lock().clone()
    }

    fn script(
        &self,
        url: &str,
        result: Result<AnnounceResponse, TrackerError>,
        delay: Option<Duration>,
    ) {
        self.replies
            .lock()
            .insert(url.to_string(), ScriptedReply { result, delay });
    }
}

#[async_trait]
impl TrackerClient for MockTrackerClient {
    async fn announce(
        &self,
        announce_url: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TrackerError> {
        self.calls.lock().push(announce_url.to_string());
        self.requests.lock().push(request.clone());

        let reply = self.replies.lock().get(announce_url).cloned();
        let Some(reply) = reply else {
            self.completed.lock().push(announce_url.to_string());
            return Err(TrackerError::Unreachable {
                reason: format!("no scripted reply for {announce_url}"),
            });
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        self.completed.lock().push(announce_url.to_string());
        reply.result
    }
}
