//! nlroute route command.

use std::io::{self, Write};
use std::net::IpAddr;

use clap::{Args, Subcommand};
use nlroute::netlink::RouteRecord;
use nlroute::netlink::route::SourceRoute;
use nlroute::{Connection, Result};
use serde::Serialize;

use super::{Prefix, interface, parse_prefix};
use crate::output::{OutputFormat, OutputOptions, Printable};

#[derive(Args)]
pub struct RouteCmd {
    #[command(subcommand)]
    action: RouteAction,
}

#[derive(Args)]
struct SourceRouteArgs {
    /// Destination prefix (e.g. 10.8.0.0/16).
    #[arg(value_parser = parse_prefix)]
    destination: Prefix,

    /// Preferred source address.
    #[arg(long, short)]
    src: IpAddr,

    /// Gateway address.
    #[arg(long)]
    via: Option<IpAddr>,

    /// Output interface name or index.
    #[arg(long, short)]
    dev: Option<String>,

    /// Routing table.
    #[arg(long, short, default_value_t = 254)]
    table: u32,

    /// Path MTU metric.
    #[arg(long)]
    mtu: Option<u32>,

    /// Advertised MSS metric.
    #[arg(long)]
    advmss: Option<u32>,
}

impl SourceRouteArgs {
    fn build(&self) -> SourceRoute {
        let mut route = SourceRoute::new(self.destination.addr, self.destination.len, self.src)
            .table(self.table);
        if let Some(gw) = self.via {
            route = route.gateway(gw);
        }
        if let Some(dev) = &self.dev {
            route = route.dev(interface(dev));
        }
        if let Some(mtu) = self.mtu {
            route = route.mtu(mtu);
        }
        if let Some(advmss) = self.advmss {
            route = route.advmss(advmss);
        }
        route
    }
}

#[derive(Subcommand)]
enum RouteAction {
    /// Add a source route, replacing a matching one.
    Add {
        #[command(flatten)]
        route: SourceRouteArgs,

        /// Fail if the route already exists instead of replacing it.
        #[arg(long)]
        exclusive: bool,
    },

    /// Delete a source route.
    Del {
        #[command(flatten)]
        route: SourceRouteArgs,
    },

    /// Show the route, source address and next hop the kernel would use.
    Get {
        /// Destination address.
        destination: IpAddr,

        /// Match routes no more specific than this prefix length.
        #[arg(long)]
        prefix: Option<u8>,

        /// Prefer routes whose source address is this one.
        #[arg(long)]
        from: Option<IpAddr>,
    },
}

/// Result of `route get`.
#[derive(Debug, Serialize)]
struct RouteLookup {
    route: RouteRecord,
    source: Option<IpAddr>,
    next_hop: IpAddr,
}

impl Printable for RouteLookup {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}", self.route.destination_str())?;
        if let Some(gw) = self.route.gateway {
            write!(w, " via {}", gw)?;
        }
        if let Some(oif) = self.route.oif {
            write!(w, " dev {}", oif)?;
        }
        if let Some(src) = self.source {
            write!(w, " src {}", src)?;
        }
        write!(w, " table {}", self.route.table)?;
        if self.route.priority != 0 {
            write!(w, " metric {}", self.route.priority)?;
        }
        writeln!(w, " nexthop {}", self.next_hop)
    }
}

impl RouteCmd {
    pub async fn run(self, conn: &Connection, format: OutputFormat, opts: &OutputOptions) -> Result<()> {
        match self.action {
            RouteAction::Add { route, exclusive } => {
                let mut route = route.build();
                if exclusive {
                    route = route.exclusive();
                }
                conn.add_source_route(&route).await
            }
            RouteAction::Del { route } => conn.del_source_route(&route.build()).await,
            RouteAction::Get {
                destination,
                prefix,
                from,
            } => {
                let route = conn.get_route(destination, prefix, from).await?;
                // A route without a preferred source leaves the choice to the kernel.
                let source = conn.get_source_addr(destination, from).await.ok();
                let next_hop = conn.get_next_hop(destination, prefix, from).await?;
                let lookup = RouteLookup {
                    route,
                    source,
                    next_hop,
                };
                let mut stdout = io::stdout().lock();
                lookup.print(&mut stdout, format, opts)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source_route() {
        let args = SourceRouteArgs {
            destination: parse_prefix("10.8.0.0/16").unwrap(),
            src: "10.0.0.5".parse().unwrap(),
            via: Some("10.0.0.1".parse().unwrap()),
            dev: Some("3".to_string()),
            table: 100,
            mtu: Some(1400),
            advmss: None,
        };
        let route = args.build();
        assert_eq!(route.prefix_len(), 16);
        assert_eq!(route.prefsrc(), args.src);
        assert_eq!(route.get_dev().and_then(|d| d.as_index()), Some(3));
        assert!(route.validate().is_ok());
    }
}
