//! Route query and best-route selection.
//!
//! Routes are fetched with a dump and ranked locally. The kernel ignores
//! destination attributes on route dumps, so coverage of the destination
//! is checked on each decoded record.
//!
//! # Selection
//!
//! Only unicast and local routes that cover the destination (and are no
//! more specific than the requested prefix) take part. A route is a
//! *primary* match when its preferred source equals the candidate source,
//! or, without a candidate, when it has any preferred source. Everything
//! else is a *secondary* match. Primary beats secondary; inside a tier the
//! lowest priority wins, then the longest prefix, then the first seen.
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::Connection;
//!
//! let conn = Connection::new()?;
//! let src = conn.get_source_addr("8.8.8.8".parse()?, None).await?;
//! let hop = conn.get_next_hop("8.8.8.8".parse()?, None, Some(src)).await?;
//! ```

use std::net::IpAddr;

use tracing::debug;

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::error::{Error, Result};
use super::message::{MessageKind, NlMsgType};
use super::messages::{RouteRecord, family_of, octets};
use super::parse::FromNetlink;
use super::transport::Transport;
use super::types::route::{RouteType, RtMsg, RtaAttr};
use crate::util::addr::max_prefix;

/// Number of times gateway resolution may recurse before giving up.
pub const MAX_RECURSION: usize = 2;

/// Write a route dump request for `destination`.
///
/// RTA_DST is only added for full-width lookups, RTA_PREFSRC only when a
/// candidate source is given.
pub fn write_route_query(
    builder: &mut MessageBuilder,
    destination: IpAddr,
    prefix_len: u8,
    candidate: Option<IpAddr>,
) -> Result<()> {
    let rtmsg = RtMsg::new()
        .with_family(family_of(&destination))
        .with_dst_len(prefix_len);
    builder.append(&rtmsg)?;

    if prefix_len == max_prefix(&destination) {
        builder.append_attr(RtaAttr::Dst as u16, &octets(&destination))?;
    }
    if let Some(src) = candidate {
        builder.append_attr(RtaAttr::Prefsrc as u16, &octets(&src))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Secondary,
    Primary,
}

fn tier(route: &RouteRecord, candidate: Option<IpAddr>) -> Tier {
    match (route.prefsrc, candidate) {
        (Some(src), Some(want)) if src == want => Tier::Primary,
        (Some(_), None) => Tier::Primary,
        _ => Tier::Secondary,
    }
}

fn eligible(route: &RouteRecord, destination: IpAddr, prefix_len: u8) -> bool {
    matches!(route.kind(), RouteType::Unicast | RouteType::Local)
        && route.prefix_len <= prefix_len
        && route.covers(destination)
}

/// `true` when `challenger` outranks `best`.
fn outranks(challenger: &RouteRecord, best: &RouteRecord) -> bool {
    (challenger.priority, std::cmp::Reverse(challenger.prefix_len))
        < (best.priority, std::cmp::Reverse(best.prefix_len))
}

/// Pick the best route to `destination/prefix_len` for `candidate`.
///
/// Only the best record so far is retained while iterating.
pub fn select_route<I>(
    routes: I,
    destination: IpAddr,
    prefix_len: u8,
    candidate: Option<IpAddr>,
) -> Option<RouteRecord>
where
    I: IntoIterator<Item = RouteRecord>,
{
    let mut best: Option<(Tier, RouteRecord)> = None;

    for route in routes {
        if !eligible(&route, destination, prefix_len) {
            continue;
        }
        let rank = tier(&route, candidate);
        let replace = match &best {
            None => true,
            Some((best_rank, best_route)) => {
                rank > *best_rank || (rank == *best_rank && outranks(&route, best_route))
            }
        };
        if replace {
            best = Some((rank, route));
        }
    }

    best.map(|(_, route)| route)
}

impl<T: Transport> Connection<T> {
    /// Dump the routes relevant to `destination` and decode every record.
    ///
    /// `prefix_len` defaults to the full address width. Records that fail
    /// to decode are skipped.
    pub async fn query_routes(
        &self,
        destination: IpAddr,
        prefix_len: Option<u8>,
        candidate: Option<IpAddr>,
    ) -> Result<Vec<RouteRecord>> {
        let prefix_len = prefix_len.unwrap_or_else(|| max_prefix(&destination));
        let mut builder = self.dump_request(NlMsgType::RTM_GETROUTE);
        write_route_query(&mut builder, destination, prefix_len, candidate)?;

        let response = self.request(builder).await?;
        let mut routes = Vec::new();
        for payload in response.dump_payloads(MessageKind::NewRoute)? {
            match RouteRecord::from_bytes(payload) {
                Ok(route) => routes.push(route),
                Err(e) => debug!(error = %e, "skipping undecodable route"),
            }
        }
        Ok(routes)
    }

    /// Find the best route to `destination`.
    ///
    /// Fails with [`Error::Unreachable`] when no route qualifies.
    pub async fn get_route(
        &self,
        destination: IpAddr,
        prefix_len: Option<u8>,
        candidate: Option<IpAddr>,
    ) -> Result<RouteRecord> {
        let width = prefix_len.unwrap_or_else(|| max_prefix(&destination));
        let routes = self
            .query_routes(destination, Some(width), candidate)
            .await?;
        let route = select_route(routes, destination, width, candidate)
            .ok_or_else(|| Error::Unreachable(destination.to_string()))?;
        debug!(
            %destination,
            route = %route.destination_str(),
            gateway = ?route.gateway,
            prefsrc = ?route.prefsrc,
            "selected route"
        );
        Ok(route)
    }

    /// Source address the host uses to reach `destination`.
    ///
    /// Follows gateways whose route carries no preferred source, at most
    /// [`MAX_RECURSION`] times.
    pub async fn get_source_addr(
        &self,
        destination: IpAddr,
        candidate: Option<IpAddr>,
    ) -> Result<IpAddr> {
        let mut target = destination;
        for _ in 0..=MAX_RECURSION {
            let route = self.get_route(target, None, candidate).await?;
            if let Some(src) = route.prefsrc {
                return Ok(src);
            }
            match route.gateway {
                Some(gateway) => target = gateway,
                None => break,
            }
        }
        Err(Error::Unreachable(destination.to_string()))
    }

    /// Next hop towards `destination/prefix_len`.
    ///
    /// A route without a gateway means the target is on-link and is its own
    /// next hop. A gateway that is itself behind a gateway is resolved
    /// recursively, at most [`MAX_RECURSION`] times.
    pub async fn get_next_hop(
        &self,
        destination: IpAddr,
        prefix_len: Option<u8>,
        candidate: Option<IpAddr>,
    ) -> Result<IpAddr> {
        let mut target = destination;
        let mut width = prefix_len;
        for _ in 0..=MAX_RECURSION {
            let route = self.get_route(target, width, candidate).await?;
            match route.gateway {
                Some(gateway) => {
                    target = gateway;
                    width = None;
                }
                None => return Ok(target),
            }
        }
        Err(Error::Unreachable(destination.to_string()))
    }
}
