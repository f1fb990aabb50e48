//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

/// Tunables for discovery, pairing, caching and HTTP access.
///
/// Durations serialize as integer milliseconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hue_bridge_rs::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .with_session_path("/tmp/bridge.cfg")
///     .with_pairing_window(Duration::from_secs(60));
/// assert_eq!(config.discovery_window, Duration::from_secs(10));
/// assert_eq!(config.pairing_window, Duration::from_secs(60));
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// File holding the bridge address and credential.
    pub session_path: PathBuf,
    /// Identifier sent when asking the bridge for a credential.
    pub device_type: String,
    /// How long SSDP responses are collected.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub discovery_window: Duration,
    /// Upper bound of a single SSDP receive.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub discovery_recv_timeout: Duration,
    /// IPv4 multicast TTL of the search request.
    pub multicast_ttl: u32,
    /// How long credential issuance is retried.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pairing_window: Duration,
    /// Delay between credential requests.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pairing_backoff: Duration,
    /// Age at which cached light and group state is refetched.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub cache_ttl: Duration,
    /// HTTP request timeout.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub http_timeout: Duration,
}

impl BridgeConfig {
    pub const DEFAULT_DEVICE_TYPE: &'static str = "hue-bridge-rs#user";
    pub const DEFAULT_SESSION_FILE: &'static str = "bridge.cfg";

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    pub fn with_discovery_window(mut self, window: Duration) -> Self {
        self.discovery_window = window;
        self
    }

    pub fn with_pairing_window(mut self, window: Duration) -> Self {
        self.pairing_window = window;
        self
    }

    pub fn with_pairing_backoff(mut self, backoff: Duration) -> Self {
        self.pairing_backoff = backoff;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            session_path: PathBuf::from(Self::DEFAULT_SESSION_FILE),
            device_type: Self::DEFAULT_DEVICE_TYPE.to_string(),
            discovery_window: Duration::from_secs(10),
            discovery_recv_timeout: Duration::from_secs(1),
            multicast_ttl: 12,
            pairing_window: Duration::from_secs(30),
            pairing_backoff: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
        }
    }
}
