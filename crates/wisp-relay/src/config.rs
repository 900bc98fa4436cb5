//! Relay node configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default listening port when neither `PORT` nor `--port` is given.
pub const DEFAULT_PORT: u16 = 8080;

/// How long a parked frame waits for a federated lookup answer.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before dialing a peer learned through discovery.
pub const DEFAULT_DIAL_DELAY: Duration = Duration::from_millis(100);

/// Configuration for one relay node.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Interface to bind the listener on.
    pub host: IpAddr,

    /// Listening port. `0` binds an ephemeral port (used by tests).
    pub port: u16,

    /// The URL this node is reachable at, used for self-address suppression
    /// in discovery. Defaults to `ws://127.0.0.1:<bound port>` when absent.
    pub public_url: Option<String>,

    /// Peer URLs dialed at startup.
    pub seeds: Vec<String>,

    /// Deadline for pending federated lookups.
    pub query_timeout: Duration,

    /// Delay before dialing discovered peers.
    pub dial_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            public_url: None,
            seeds: Vec::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            dial_delay: DEFAULT_DIAL_DELAY,
        }
    }
}

impl RelayConfig {
    /// A config for tests: ephemeral port, loopback, short query timeout.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Self::default()
        }
    }
}
