//! Source route management.
//!
//! A source route is a unicast route that pins the preferred source
//! address for traffic to a destination prefix, optionally via a gateway
//! and an output interface, with path MTU and advertised MSS metrics.
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::Connection;
//! use nlroute::netlink::route::SourceRoute;
//!
//! let conn = Connection::new()?;
//!
//! let route = SourceRoute::new("10.8.0.0".parse()?, 16, "10.0.0.1".parse()?)
//!     .gateway("10.0.0.254".parse()?)
//!     .dev("eth0")
//!     .mtu(1400)
//!     .advmss(1360);
//!
//! conn.add_source_route(&route).await?;
//! conn.del_source_route(&route).await?;
//! ```
//!
//! A prefix length of zero (the default route) is refused before any
//! request is sent.

use std::net::IpAddr;

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::error::{Error, Result};
use super::interface_ref::InterfaceRef;
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NLM_F_REPLACE, NlMsgType};
use super::messages::{family_of, octets};
use super::transport::Transport;
use super::types::route::{RouteProtocol, RouteScope, RouteType, RtMsg, RtaAttr, rt_table, rtax};
use crate::util::addr::max_prefix;

/// Route metrics nested under RTA_METRICS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMetrics {
    /// Path MTU.
    pub mtu: Option<u32>,
    /// Advertised MSS.
    pub advmss: Option<u32>,
}

impl RouteMetrics {
    /// Create empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set path MTU.
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Set advertised MSS.
    pub fn advmss(mut self, advmss: u32) -> Self {
        self.advmss = Some(advmss);
        self
    }

    /// Check if any metrics are set.
    pub fn has_any(&self) -> bool {
        self.mtu.is_some() || self.advmss.is_some()
    }

    /// Write the RTA_METRICS nest. Nothing is written when no metric is set.
    pub fn write_to(&self, builder: &mut MessageBuilder) -> Result<()> {
        if !self.has_any() {
            return Ok(());
        }
        let nest = builder.nest_start(RtaAttr::Metrics as u16)?;
        if let Some(mtu) = self.mtu {
            builder.append_attr_u32(rtax::MTU, mtu)?;
        }
        if let Some(advmss) = self.advmss {
            builder.append_attr_u32(rtax::ADVMSS, advmss)?;
        }
        builder.nest_end(nest);
        Ok(())
    }
}

/// A unicast route with a preferred source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoute {
    destination: IpAddr,
    prefix_len: u8,
    prefsrc: IpAddr,
    gateway: Option<IpAddr>,
    dev: Option<InterfaceRef>,
    table: u32,
    metrics: RouteMetrics,
    exclusive: bool,
}

impl SourceRoute {
    /// Route `destination/prefix_len` with preferred source `prefsrc`.
    pub fn new(destination: IpAddr, prefix_len: u8, prefsrc: IpAddr) -> Self {
        Self {
            destination,
            prefix_len,
            prefsrc,
            gateway: None,
            dev: None,
            table: rt_table::MAIN as u32,
            metrics: RouteMetrics::default(),
            exclusive: false,
        }
    }

    /// Route through a gateway.
    pub fn gateway(mut self, gateway: IpAddr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the output interface.
    pub fn dev(mut self, dev: impl Into<InterfaceRef>) -> Self {
        self.dev = Some(dev.into());
        self
    }

    /// Install into `table` instead of the main table.
    pub fn table(mut self, table: u32) -> Self {
        self.table = table;
        self
    }

    /// Set the path MTU metric.
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.metrics = self.metrics.mtu(mtu);
        self
    }

    /// Set the advertised MSS metric.
    pub fn advmss(mut self, advmss: u32) -> Self {
        self.metrics = self.metrics.advmss(advmss);
        self
    }

    /// Fail on add if the route already exists instead of replacing it.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Destination prefix.
    pub fn destination(&self) -> IpAddr {
        self.destination
    }

    /// Destination prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Preferred source address.
    pub fn prefsrc(&self) -> IpAddr {
        self.prefsrc
    }

    /// Output interface, if set.
    pub fn get_dev(&self) -> Option<&InterfaceRef> {
        self.dev.as_ref()
    }

    /// Check the route before anything is encoded.
    ///
    /// Default routes are refused with [`Error::NotSupported`]; mixed
    /// families and prefixes longer than the address are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.prefix_len == 0 {
            return Err(Error::NotSupported(format!(
                "refusing to install source route for default destination {}/0",
                self.destination
            )));
        }
        if self.prefix_len > max_prefix(&self.destination) {
            return Err(Error::InvalidMessage(format!(
                "prefix length {} too long for {}",
                self.prefix_len, self.destination
            )));
        }
        let family = family_of(&self.destination);
        let mismatched = std::iter::once(self.prefsrc)
            .chain(self.gateway)
            .find(|addr| family_of(addr) != family);
        if let Some(addr) = mismatched {
            return Err(Error::InvalidMessage(format!(
                "address family of {} does not match {}",
                addr, self.destination
            )));
        }
        Ok(())
    }

    /// Write the route header and attributes.
    ///
    /// Attribute order: RTA_DST, RTA_PREFSRC, RTA_GATEWAY, RTA_OIF,
    /// RTA_TABLE, RTA_METRICS. Metrics are skipped on delete.
    pub fn write_to(
        &self,
        builder: &mut MessageBuilder,
        oif: Option<u32>,
        with_metrics: bool,
    ) -> Result<()> {
        let rtmsg = RtMsg::new()
            .with_family(family_of(&self.destination))
            .with_dst_len(self.prefix_len)
            .with_table(self.table)
            .with_protocol(RouteProtocol::Static)
            .with_scope(RouteScope::Universe)
            .with_type(RouteType::Unicast);
        builder.append(&rtmsg)?;

        builder.append_attr(RtaAttr::Dst as u16, &octets(&self.destination))?;
        builder.append_attr(RtaAttr::Prefsrc as u16, &octets(&self.prefsrc))?;
        if let Some(gateway) = self.gateway {
            builder.append_attr(RtaAttr::Gateway as u16, &octets(&gateway))?;
        }
        if let Some(oif) = oif {
            builder.append_attr_u32(RtaAttr::Oif as u16, oif)?;
        }
        if self.table > 255 {
            builder.append_attr_u32(RtaAttr::Table as u16, self.table)?;
        }
        if with_metrics {
            self.metrics.write_to(builder)?;
        }
        Ok(())
    }

    fn resolve_dev(&self) -> Result<Option<u32>> {
        self.dev.as_ref().map(InterfaceRef::resolve).transpose()
    }
}

impl<T: Transport> Connection<T> {
    /// Build the request that installs a source route.
    pub fn add_source_route_request(
        &self,
        route: &SourceRoute,
        oif: Option<u32>,
    ) -> Result<MessageBuilder> {
        route.validate()?;
        let flags = if route.exclusive {
            NLM_F_CREATE | NLM_F_EXCL
        } else {
            NLM_F_CREATE | NLM_F_REPLACE
        };
        let mut builder = self.ack_request(NlMsgType::RTM_NEWROUTE, flags);
        route.write_to(&mut builder, oif, true)?;
        Ok(builder)
    }

    /// Build the request that removes a source route.
    pub fn del_source_route_request(
        &self,
        route: &SourceRoute,
        oif: Option<u32>,
    ) -> Result<MessageBuilder> {
        route.validate()?;
        let mut builder = self.ack_request(NlMsgType::RTM_DELROUTE, 0);
        route.write_to(&mut builder, oif, false)?;
        Ok(builder)
    }

    /// Install a source route, replacing an existing one unless the route
    /// is [exclusive](SourceRoute::exclusive).
    pub async fn add_source_route(&self, route: &SourceRoute) -> Result<()> {
        route.validate()?;
        let oif = route.resolve_dev()?;
        let builder = self.add_source_route_request(route, oif)?;
        self.request_ack(builder).await
    }

    /// Remove a source route.
    pub async fn del_source_route(&self, route: &SourceRoute) -> Result<()> {
        route.validate()?;
        let oif = route.resolve_dev()?;
        let builder = self.del_source_route_request(route, oif)?;
        self.request_ack(builder).await
    }
}
