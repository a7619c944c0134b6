//! Route records (RTM_NEWROUTE / RTM_DELROUTE).

use std::net::IpAddr;

use crate::netlink::attr::{AttrIter, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::{FromNetlink, PResult, parse_header};
use crate::netlink::types::route::{RouteProtocol, RouteScope, RouteType, RtMsg, RtaAttr};
use crate::util::addr::prefix_contains;

use super::{ip_for_family, unspecified};

/// A route decoded from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RouteRecord {
    /// Address family (AF_INET / AF_INET6).
    pub family: u8,
    /// Destination network; unspecified when the route has no RTA_DST.
    pub destination: IpAddr,
    /// Destination prefix length.
    pub prefix_len: u8,
    /// Gateway (RTA_GATEWAY).
    pub gateway: Option<IpAddr>,
    /// Preferred source address (RTA_PREFSRC).
    pub prefsrc: Option<IpAddr>,
    /// Output interface index (RTA_OIF).
    pub oif: Option<u32>,
    /// Routing table; RTA_TABLE overrides the 8-bit header field.
    pub table: u32,
    /// Priority/metric (RTA_PRIORITY), 0 when absent.
    pub priority: u32,
    /// Route type (RTN_*).
    pub route_type: u8,
    /// Routing protocol (RTPROT_*).
    pub protocol: u8,
    /// Route scope.
    pub scope: u8,
}

impl RouteRecord {
    /// Get the route type.
    pub fn kind(&self) -> RouteType {
        RouteType::from(self.route_type)
    }

    /// Get the route protocol.
    pub fn protocol(&self) -> RouteProtocol {
        RouteProtocol::from(self.protocol)
    }

    /// Get the route scope.
    pub fn scope(&self) -> RouteScope {
        RouteScope::from(self.scope)
    }

    /// Check if this is an IPv4 route.
    pub fn is_ipv4(&self) -> bool {
        self.family == libc::AF_INET as u8
    }

    /// Check if this is a default route (0.0.0.0/0 or ::/0).
    pub fn is_default(&self) -> bool {
        self.prefix_len == 0
    }

    /// Check whether `addr` lies inside this route's destination prefix.
    pub fn covers(&self, addr: IpAddr) -> bool {
        prefix_contains(self.destination, self.prefix_len, addr)
    }

    /// Format the destination as a CIDR string (e.g., "10.0.0.0/8" or "default").
    pub fn destination_str(&self) -> String {
        if self.is_default() {
            "default".to_string()
        } else {
            format!("{}/{}", self.destination, self.prefix_len)
        }
    }
}

impl FromNetlink for RouteRecord {
    fn write_dump_header(builder: &mut MessageBuilder) -> Result<()> {
        builder.append(&RtMsg::new())
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header: RtMsg = parse_header(input)?;
        let family = header.rtm_family;

        let mut route = RouteRecord {
            family,
            destination: unspecified(family),
            prefix_len: header.rtm_dst_len,
            gateway: None,
            prefsrc: None,
            oif: None,
            table: u32::from(header.rtm_table),
            priority: 0,
            route_type: header.rtm_type,
            protocol: header.rtm_protocol,
            scope: header.rtm_scope,
        };

        for (attr_type, data) in AttrIter::new(*input) {
            match attr_type {
                t if t == RtaAttr::Dst as u16 => {
                    if let Some(addr) = ip_for_family(data, family) {
                        route.destination = addr;
                    }
                }
                t if t == RtaAttr::Gateway as u16 => {
                    route.gateway = ip_for_family(data, family).or(route.gateway);
                }
                t if t == RtaAttr::Prefsrc as u16 => {
                    route.prefsrc = ip_for_family(data, family).or(route.prefsrc);
                }
                t if t == RtaAttr::Oif as u16 => {
                    route.oif = get::u32_ne(data).or(route.oif);
                }
                t if t == RtaAttr::Priority as u16 => {
                    if let Some(v) = get::u32_ne(data) {
                        route.priority = v;
                    }
                }
                t if t == RtaAttr::Table as u16 => {
                    if let Some(v) = get::u32_ne(data) {
                        route.table = v;
                    }
                }
                _ => {}
            }
        }
        *input = &[];

        Ok(route)
    }
}
