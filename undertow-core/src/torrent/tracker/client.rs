//! HTTP tracker client built on reqwest.

use std::time::Duration;

use async_trait::async_trait;

use super::error::TrackerError;
use super::protocol::constants::MAX_RESPONSE_BYTES;
use super::protocol::{build_announce_url, parse_announce_response};
use super::types::{AnnounceRequest, AnnounceResponse, TrackerClient, TrackerResponse};
use crate::config::NetworkConfig;
use crate::torrent::TorrentError;

/// HTTP tracker client implementation.
///
/// One client serves every announce URL; the whole request, connect to
/// last body byte, is bounded by the configured tracker timeout.
#[derive(Debug, Clone)]
pub struct HttpTrackerClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTrackerClient {
    /// Creates HTTP tracker client from network configuration.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Http` - If the underlying HTTP client cannot be built
    pub fn new(config: &NetworkConfig) -> Result<Self, TorrentError> {
        let client = reqwest::Client::builder()
            .timeout(config.tracker_timeout)
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            timeout: config.tracker_timeout,
        })
    }

    fn transport_error(&self, url: &str, error: &reqwest::Error) -> TrackerError {
        tracing::debug!("HTTP request to {} failed: {}", url, error);
        if error.is_timeout() {
            TrackerError::Timeout {
                timeout: self.timeout,
            }
        } else {
            TrackerError::Unreachable {
                reason: error.to_string(),
            }
        }
    }

    /// Reads the response body, refusing anything over `MAX_RESPONSE_BYTES`.
    async fn read_body(
        &self,
        url: &str,
        mut response: reqwest::Response,
    ) -> Result<Vec<u8>, TrackerError> {
        if let Some(length) = response.content_length()
            && length > MAX_RESPONSE_BYTES as u64
        {
            return Err(oversized_body());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(url, &e))?
        {
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(oversized_body());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn oversized_body() -> TrackerError {
    TrackerError::MalformedResponse {
        reason: format!("body larger than {MAX_RESPONSE_BYTES} bytes"),
    }
}

#[async_trait]
impl TrackerClient for HttpTrackerClient {
    async fn announce(
        &self,
        announce_url: &str,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TrackerError> {
        let url = build_announce_url(announce_url, request)?;
        tracing::debug!("Announcing {} to tracker: {}", request.info_hash, announce_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(announce_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = self.read_body(announce_url, response).await?;

        match parse_announce_response(&body)? {
            TrackerResponse::Failure { reason } => Err(TrackerError::Rejected { reason }),
            TrackerResponse::Success(response) => {
                if let Some(warning) = &response.warning {
                    tracing::warn!("Tracker {} warning: {}", announce_url, warning);
                }
                Ok(response)
            }
        }
    }
}
