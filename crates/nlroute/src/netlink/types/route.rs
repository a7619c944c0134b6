//! Route message types.

use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Route message (struct rtmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family.
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// TOS filter.
    pub rtm_tos: u8,
    /// Routing table ID (low 8 bits).
    pub rtm_table: u8,
    /// Routing protocol (RTPROT_*).
    pub rtm_protocol: u8,
    /// Route scope (RT_SCOPE_*).
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    /// Route flags (RTM_F_*).
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new route message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address family.
    pub fn with_family(mut self, family: u8) -> Self {
        self.rtm_family = family;
        self
    }

    /// Set the destination prefix length.
    pub fn with_dst_len(mut self, len: u8) -> Self {
        self.rtm_dst_len = len;
        self
    }

    /// Set the routing table (values above 255 go in RTA_TABLE).
    pub fn with_table(mut self, table: u32) -> Self {
        self.rtm_table = if table > 255 {
            rt_table::UNSPEC
        } else {
            table as u8
        };
        self
    }

    /// Set the routing protocol.
    pub fn with_protocol(mut self, protocol: RouteProtocol) -> Self {
        self.rtm_protocol = protocol as u8;
        self
    }

    /// Set the route scope.
    pub fn with_scope(mut self, scope: RouteScope) -> Self {
        self.rtm_scope = scope as u8;
        self
    }

    /// Set the route type.
    pub fn with_type(mut self, rtype: RouteType) -> Self {
        self.rtm_type = rtype as u8;
        self
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            })
    }
}

/// Route attributes (RTA_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RtaAttr {
    Unspec = 0,
    Dst = 1,
    Src = 2,
    Iif = 3,
    Oif = 4,
    Gateway = 5,
    Priority = 6,
    Prefsrc = 7,
    Metrics = 8,
    Table = 15,
}

/// Route metric attributes (RTAX_*), nested under RTA_METRICS.
pub mod rtax {
    pub const MTU: u16 = 2;
    pub const ADVMSS: u16 = 8;
}

/// Well-known routing table IDs.
pub mod rt_table {
    pub const UNSPEC: u8 = 0;
    pub const DEFAULT: u8 = 253;
    pub const MAIN: u8 = 254;
    pub const LOCAL: u8 = 255;
}

/// Routing protocol (who installed the route).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RouteProtocol {
    #[default]
    Unspec = 0,
    Redirect = 1,
    Kernel = 2,
    Boot = 3,
    Static = 4,
}

impl From<u8> for RouteProtocol {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::Redirect,
            2 => Self::Kernel,
            3 => Self::Boot,
            4 => Self::Static,
            _ => Self::Unspec,
        }
    }
}

/// Route scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RouteScope {
    #[default]
    Universe = 0,
    Site = 200,
    Link = 253,
    Host = 254,
    Nowhere = 255,
}

impl From<u8> for RouteScope {
    fn from(val: u8) -> Self {
        match val {
            200 => Self::Site,
            253 => Self::Link,
            254 => Self::Host,
            255 => Self::Nowhere,
            _ => Self::Universe,
        }
    }
}

/// Route type (RTN_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RouteType {
    #[default]
    Unspec = 0,
    Unicast = 1,
    Local = 2,
    Broadcast = 3,
    Anycast = 4,
    Multicast = 5,
    Blackhole = 6,
    Unreachable = 7,
    Prohibit = 8,
}

impl From<u8> for RouteType {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::Unicast,
            2 => Self::Local,
            3 => Self::Broadcast,
            4 => Self::Anycast,
            5 => Self::Multicast,
            6 => Self::Blackhole,
            7 => Self::Unreachable,
            8 => Self::Prohibit,
            _ => Self::Unspec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtmsg_layout() {
        assert_eq!(RtMsg::SIZE, 12);
        let msg = RtMsg::new()
            .with_family(libc::AF_INET as u8)
            .with_dst_len(32)
            .with_table(254)
            .with_protocol(RouteProtocol::Static)
            .with_type(RouteType::Unicast);
        let bytes = msg.as_bytes();
        assert_eq!(bytes[0], libc::AF_INET as u8);
        assert_eq!(bytes[1], 32);
        assert_eq!(bytes[4], 254);
        assert_eq!(bytes[5], 4);
        assert_eq!(bytes[7], 1);
    }

    #[test]
    fn test_large_table_goes_to_attribute() {
        assert_eq!(RtMsg::new().with_table(1000).rtm_table, rt_table::UNSPEC);
    }
}
