//! Centralized configuration for Undertow.
//!
//! All tunable parameters are defined here so registry, tracker client and
//! CLI agree on the same defaults.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

/// Default number of concurrent announce attempts in `FailoverStrategy::Concurrent`.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Central configuration for all Undertow components.
///
/// Supports environment variable overrides through [`UndertowConfig::from_env`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndertowConfig {
    pub torrent: TorrentConfig,
    pub network: NetworkConfig,
}

/// Torrent identity and registry behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentConfig {
    /// Azureus-style client prefix, exactly 8 bytes
    pub client_id: &'static str,
    /// What makes two registry entries the same torrent
    pub identity: IdentityPolicy,
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            client_id: "-UT0001-",
            identity: IdentityPolicy::Name,
        }
    }
}

/// Tracker communication parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Upper bound on one announce request, connect to body
    pub tracker_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// Redirects followed before an announce is treated as failed
    pub max_redirects: usize,
    /// Port reported to trackers
    pub listen_port: u16,
    /// Ask trackers for the compact peer list
    pub request_compact: bool,
    pub failover: FailoverStrategy,
    pub tier_policy: TierPolicy,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tracker_timeout: Duration::from_secs(5),
            user_agent: "undertow/0.1.0",
            max_redirects: 3,
            listen_port: 6881,
            request_compact: false,
            failover: FailoverStrategy::Sequential,
            tier_policy: TierPolicy::FirstPerTier,
        }
    }
}

/// Key used for duplicate detection in the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// Two torrents with the same `info.name` are duplicates
    #[default]
    Name,
    /// Two torrents with the same info-hash are duplicates
    InfoHash,
}

/// How announce URLs are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailoverStrategy {
    /// One URL at a time, in list order
    #[default]
    Sequential,
    /// Up to `max_in_flight` requests at once; first success wins and the
    /// remaining requests are cancelled
    Concurrent { max_in_flight: usize },
}

/// Which `announce-list` URLs take part in failover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TierPolicy {
    /// Only the first URL of every tier
    #[default]
    FirstPerTier,
    /// Every URL of a tier before moving to the next tier
    EveryUrl,
}

impl UndertowConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Recognised variables: `UNDERTOW_TRACKER_TIMEOUT` (seconds),
    /// `UNDERTOW_LISTEN_PORT`, `UNDERTOW_IDENTITY`, `UNDERTOW_FAILOVER` and
    /// `UNDERTOW_TIER_POLICY`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seconds) =
            parse_override::<NonZeroU64>(&lookup, "UNDERTOW_TRACKER_TIMEOUT")
        {
            self.network.tracker_timeout = Duration::from_secs(seconds.get());
        }
        if let Some(port) = parse_override(&lookup, "UNDERTOW_LISTEN_PORT") {
            self.network.listen_port = port;
        }
        if let Some(identity) = parse_override(&lookup, "UNDERTOW_IDENTITY") {
            self.torrent.identity = identity;
        }
        if let Some(failover) = parse_override(&lookup, "UNDERTOW_FAILOVER") {
            self.network.failover = failover;
        }
        if let Some(tier_policy) = parse_override(&lookup, "UNDERTOW_TIER_POLICY") {
            self.network.tier_policy = tier_policy;
        }
        self
    }

    /// Creates a configuration suited to tests against local trackers.
    pub fn for_testing() -> Self {
        Self {
            network: NetworkConfig {
                tracker_timeout: Duration::from_millis(500),
                max_redirects: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn parse_override<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

impl FromStr for IdentityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(IdentityPolicy::Name),
            "info-hash" | "infohash" | "hash" => Ok(IdentityPolicy::InfoHash),
            _ => Err(format!("Invalid identity policy: {s}")),
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityPolicy::Name => write!(f, "name"),
            IdentityPolicy::InfoHash => write!(f, "info-hash"),
        }
    }
}

impl FromStr for FailoverStrategy {
    type Err = String;

    /// Accepts `sequential`, `concurrent` or `concurrent:<n>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.split_once(':') {
            None if lower == "sequential" => Ok(FailoverStrategy::Sequential),
            None if lower == "concurrent" => Ok(FailoverStrategy::Concurrent {
                max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            }),
            Some(("concurrent", count)) => match count.parse::<usize>() {
                Ok(max_in_flight) if max_in_flight > 0 => {
                    Ok(FailoverStrategy::Concurrent { max_in_flight })
                }
                _ => Err(format!("Invalid concurrency limit: {count}")),
            },
            _ => Err(format!("Invalid failover strategy: {s}")),
        }
    }
}

impl fmt::Display for FailoverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverStrategy::Sequential => write!(f, "sequential"),
            FailoverStrategy::Concurrent { max_in_flight } => {
                write!(f, "concurrent:{max_in_flight}")
            }
        }
    }
}

impl FromStr for TierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" | "first-per-tier" => Ok(TierPolicy::FirstPerTier),
            "every" | "every-url" => Ok(TierPolicy::EveryUrl),
            _ => Err(format!("Invalid tier policy: {s}")),
        }
    }
}

impl fmt::Display for TierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierPolicy::FirstPerTier => write!(f, "first"),
            TierPolicy::EveryUrl => write!(f, "every"),
        }
    }
}
