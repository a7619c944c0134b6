//! Typed records decoded from rtnetlink replies and notifications.
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::messages::RouteRecord;
//! use nlroute::netlink::parse::FromNetlink;
//!
//! let route = RouteRecord::from_bytes(payload)?;
//! println!("{}/{} via {:?}", route.destination, route.prefix_len, route.gateway);
//! ```

mod address;
mod link;
mod route;

pub use address::*;
pub use link::*;
pub use route::*;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::attr::get;

/// Decode an address attribute, accepting only the width of `family`.
pub(crate) fn ip_for_family(data: &[u8], family: u8) -> Option<IpAddr> {
    match (family as i32, data.len()) {
        (libc::AF_INET, 4) | (libc::AF_INET6, 16) => get::ip(data),
        (libc::AF_UNSPEC, _) => get::ip(data),
        _ => None,
    }
}

/// Unspecified address for a family (used when RTA_DST is absent).
pub(crate) fn unspecified(family: u8) -> IpAddr {
    if family as i32 == libc::AF_INET6 {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

/// Address family of an IP address.
pub(crate) fn family_of(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => libc::AF_INET as u8,
        IpAddr::V6(_) => libc::AF_INET6 as u8,
    }
}

/// Network-order bytes of an IP address (4 or 16 bytes).
pub(crate) fn octets(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}
