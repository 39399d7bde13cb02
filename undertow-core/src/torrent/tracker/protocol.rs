//! HTTP tracker wire format: announce URL construction and response decoding.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;

use super::error::TrackerError;
use super::types::{AnnounceRequest, AnnounceResponse, PeerAddress, TrackerResponse};
use crate::torrent::bencode::{self, Dictionary, Value};

/// BitTorrent tracker protocol constants
pub mod constants {
    /// Port reported when none is configured
    pub const DEFAULT_PORT: u16 = 6881;

    /// Compact IPv4 peer entry: 4-byte address + 2-byte port
    pub const COMPACT_PEER_V4_LEN: usize = 6;

    /// Compact IPv6 peer entry: 16-byte address + 2-byte port
    pub const COMPACT_PEER_V6_LEN: usize = 18;

    /// Largest announce response body accepted from a tracker
    pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;
}

use constants::{COMPACT_PEER_V4_LEN, COMPACT_PEER_V6_LEN};

/// Appends the announce query to `base_url`.
///
/// Binary values are percent-encoded byte by byte; the base URL is kept
/// verbatim so an existing query string survives.
///
/// # Errors
///
/// - `TrackerError::InvalidUrl` - If `base_url` does not parse
/// - `TrackerError::UnsupportedScheme` - If the scheme is not http or https
pub fn build_announce_url(base_url: &str, request: &AnnounceRequest) -> Result<String, TrackerError> {
    let parsed = url::Url::parse(base_url).map_err(|e| TrackerError::InvalidUrl {
        reason: format!("{base_url}: {e}"),
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TrackerError::UnsupportedScheme {
                scheme: other.to_string(),
            });
        }
    }

    let separator = match parsed.query() {
        None => "?",
        Some(_) if base_url.ends_with('?') || base_url.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut url = format!(
        "{}{}info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}",
        base_url,
        separator,
        request.info_hash.url_encoded(),
        urlencoding::encode_binary(request.peer_id.as_bytes()),
        request.port,
        request.uploaded,
        request.downloaded,
        request.left
    );
    if request.compact {
        url.push_str("&compact=1");
    }
    Ok(url)
}

/// Decodes a tracker response body.
///
/// # Errors
///
/// - `TrackerError::MalformedResponse` - If the body is not bencode, or a
///   non-failure response lacks `interval` or `peers`
pub fn parse_announce_response(body: &[u8]) -> Result<TrackerResponse, TrackerError> {
    let root = bencode::decode(body).map_err(|e| malformed(format!("undecodable body: {e}")))?;
    let dict = root
        .as_dict()
        .ok_or_else(|| malformed(format!("expected dictionary, found {}", root.kind())))?;

    if let Some(reason) = dict.get(b"failure reason") {
        let reason = reason
            .as_bytes()
            .ok_or_else(|| malformed("'failure reason' is not a byte string"))?;
        return Ok(TrackerResponse::Failure {
            reason: String::from_utf8_lossy(reason).into_owned(),
        });
    }

    let interval = dict
        .get(b"interval")
        .and_then(Value::as_integer)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| malformed("missing or invalid 'interval'"))?;

    let mut peers = match dict.get(b"peers") {
        Some(Value::Bytes(compact)) => parse_compact_v4(compact)?,
        Some(Value::List(entries)) => parse_peer_dicts(entries)?,
        Some(other) => return Err(malformed(format!("'peers' is a {}", other.kind()))),
        None => return Err(malformed("missing 'peers'")),
    };
    if let Some(Value::Bytes(compact)) = dict.get(b"peers6") {
        peers.extend(parse_compact_v6(compact)?);
    }

    Ok(TrackerResponse::Success(AnnounceResponse {
        interval,
        min_interval: optional_u32(dict, b"min interval"),
        tracker_id: optional_text(dict, b"tracker id"),
        complete: optional_u32(dict, b"complete"),
        incomplete: optional_u32(dict, b"incomplete"),
        warning: optional_text(dict, b"warning message"),
        peers,
    }))
}

/// Parses the compact IPv4 peer string.
///
/// # Errors
///
/// - `TrackerError::MalformedResponse` - If the length is not a multiple of 6
pub fn parse_compact_v4(bytes: &[u8]) -> Result<Vec<PeerAddress>, TrackerError> {
    if !bytes.len().is_multiple_of(COMPACT_PEER_V4_LEN) {
        return Err(malformed(format!(
            "compact peer list length {} is not a multiple of {COMPACT_PEER_V4_LEN}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(COMPACT_PEER_V4_LEN)
        .map(|chunk| PeerAddress {
            peer_id: None,
            ip: Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]).to_string(),
            port: u16::from_be_bytes([chunk[4], chunk[5]]),
        })
        .collect())
}

/// Parses the compact IPv6 `peers6` string.
///
/// # Errors
///
/// - `TrackerError::MalformedResponse` - If the length is not a multiple of 18
pub fn parse_compact_v6(bytes: &[u8]) -> Result<Vec<PeerAddress>, TrackerError> {
    if !bytes.len().is_multiple_of(COMPACT_PEER_V6_LEN) {
        return Err(malformed(format!(
            "compact peers6 length {} is not a multiple of {COMPACT_PEER_V6_LEN}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(COMPACT_PEER_V6_LEN)
        .map(|chunk| {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&chunk[..16]);
            PeerAddress {
                peer_id: None,
                ip: Ipv6Addr::from(octets).to_string(),
                port: u16::from_be_bytes([chunk[16], chunk[17]]),
            }
        })
        .collect())
}

fn parse_peer_dicts(entries: &[Value]) -> Result<Vec<PeerAddress>, TrackerError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let dict = entry
                .as_dict()
                .ok_or_else(|| malformed(format!("peer {index} is a {}", entry.kind())))?;

            let ip = dict
                .get(b"ip")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(format!("peer {index} has no textual 'ip'")))?;
            let port = dict
                .get(b"port")
                .and_then(Value::as_integer)
                .and_then(|port| u16::try_from(port).ok())
                .ok_or_else(|| malformed(format!("peer {index} has no valid 'port'")))?;
            let peer_id = dict.get(b"peer id").and_then(Value::as_bytes).cloned();

            Ok(PeerAddress {
                peer_id,
                ip: ip.to_string(),
                port,
            })
        })
        .collect()
}

fn optional_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .and_then(Value::as_integer)
        .and_then(|value| u32::try_from(value).ok())
}

fn optional_text(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .and_then(Value::as_bytes)
        .map(|bytes: &Bytes| String::from_utf8_lossy(bytes).into_owned())
}

fn malformed(reason: impl Into<String>) -> TrackerError {
    TrackerError::MalformedResponse {
        reason: reason.into(),
    }
}
