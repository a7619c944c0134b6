//! Tunables for connections and the event listener.

use std::time::Duration;

use super::builder::DEFAULT_REQUEST_CAPACITY;
use super::socket::rtnetlink_groups::*;

/// Default per-datagram receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default number of transmissions for one request (first send included).
pub const DEFAULT_RETRIES: u32 = 3;
/// Default receive buffer size.
pub const DEFAULT_RECV_BUFFER: usize = 32768;
/// Default delay after a failed listener receive.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Settings for a command [`Connection`](super::Connection).
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use nlroute::netlink::{Connection, ConnectionConfig};
///
/// let conn = Connection::with_config(
///     ConnectionConfig::new()
///         .timeout(Duration::from_millis(250))
///         .retries(5),
/// )?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub(crate) timeout: Duration,
    pub(crate) retries: u32,
    pub(crate) recv_buffer: usize,
    pub(crate) request_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            recv_buffer: DEFAULT_RECV_BUFFER,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// How long to wait for each reply datagram.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total transmissions allowed while the kernel answers EBUSY (minimum 1).
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Size of the buffer each datagram is received into.
    pub fn recv_buffer(mut self, size: usize) -> Self {
        self.recv_buffer = size;
        self
    }

    /// Capacity of the fixed request buffer.
    pub fn request_capacity(mut self, size: usize) -> Self {
        self.request_capacity = size;
        self
    }

    /// Configured receive timeout.
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Configured retry budget.
    pub fn get_retries(&self) -> u32 {
        self.retries
    }
}

/// Settings for the [`EventListener`](super::events::EventListener).
///
/// All groups are enabled by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub(crate) links: bool,
    pub(crate) ipv4_addr: bool,
    pub(crate) ipv6_addr: bool,
    pub(crate) ipv4_route: bool,
    pub(crate) ipv6_route: bool,
    pub(crate) backoff: Duration,
    pub(crate) recv_buffer: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            links: true,
            ipv4_addr: true,
            ipv6_addr: true,
            ipv4_route: true,
            ipv6_route: true,
            backoff: DEFAULT_BACKOFF,
            recv_buffer: DEFAULT_RECV_BUFFER,
        }
    }
}

impl ListenerConfig {
    /// Create a configuration subscribed to every group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration subscribed to nothing; enable groups explicitly.
    pub fn none() -> Self {
        Self {
            links: false,
            ipv4_addr: false,
            ipv6_addr: false,
            ipv4_route: false,
            ipv6_route: false,
            ..Self::default()
        }
    }

    /// Subscribe to link changes.
    pub fn links(mut self, enable: bool) -> Self {
        self.links = enable;
        self
    }

    /// Subscribe to IPv4 and IPv6 address changes.
    pub fn addresses(mut self, enable: bool) -> Self {
        self.ipv4_addr = enable;
        self.ipv6_addr = enable;
        self
    }

    /// Subscribe to IPv4 and IPv6 route changes.
    pub fn routes(mut self, enable: bool) -> Self {
        self.ipv4_route = enable;
        self.ipv6_route = enable;
        self
    }

    /// Subscribe to IPv4 address changes only.
    pub fn ipv4_addresses(mut self, enable: bool) -> Self {
        self.ipv4_addr = enable;
        self
    }

    /// Subscribe to IPv6 address changes only.
    pub fn ipv6_addresses(mut self, enable: bool) -> Self {
        self.ipv6_addr = enable;
        self
    }

    /// Delay before receiving again after a receive error.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Size of the buffer each notification datagram is received into.
    pub fn recv_buffer(mut self, size: usize) -> Self {
        self.recv_buffer = size;
        self
    }

    /// Multicast groups to join.
    pub fn groups(&self) -> Vec<u32> {
        let mut groups = Vec::new();
        if self.links {
            groups.push(RTNLGRP_LINK);
        }
        if self.ipv4_addr {
            groups.push(RTNLGRP_IPV4_IFADDR);
        }
        if self.ipv4_route {
            groups.push(RTNLGRP_IPV4_ROUTE);
        }
        if self.ipv6_addr {
            groups.push(RTNLGRP_IPV6_IFADDR);
        }
        if self.ipv6_route {
            groups.push(RTNLGRP_IPV6_ROUTE);
        }
        groups
    }
}
