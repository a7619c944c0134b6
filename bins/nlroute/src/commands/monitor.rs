//! nlroute monitor - watch link, address and route events.

use std::io::{self, Write};

use clap::{Args, ValueEnum};
use nlroute::Result;
use nlroute::netlink::{EventListener, ListenerConfig, NetworkEvent};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::output::{OutputFormat, OutputOptions, Printable, format_flags, write_timestamp};

/// Event types that can be monitored.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum EventType {
    /// Link state changes (interfaces up/down, created, deleted).
    Link,
    /// Address changes (added, removed).
    Address,
    /// Routing table changes.
    Route,
    /// All event types.
    All,
}

#[derive(Args)]
pub struct MonitorCmd {
    /// Event types to monitor.
    #[arg(default_value = "all")]
    objects: Vec<EventType>,

    /// Label output lines with event timestamps.
    #[arg(short = 't', long)]
    timestamp: bool,
}

impl MonitorCmd {
    fn listener_config(&self) -> ListenerConfig {
        let wants = |kind| {
            self.objects
                .iter()
                .any(|o| *o == kind || *o == EventType::All)
        };
        ListenerConfig::none()
            .links(wants(EventType::Link))
            .addresses(wants(EventType::Address))
            .routes(wants(EventType::Route))
    }

    pub async fn run(&self, format: OutputFormat, opts: &OutputOptions) -> Result<()> {
        let opts = OutputOptions {
            timestamp: self.timestamp,
            ..*opts
        };
        let (handle, mut events) = EventListener::stream(self.listener_config())?;

        if format == OutputFormat::Text {
            eprintln!("Monitoring netlink events (Ctrl+C to stop)...");
        }

        let mut stdout = io::stdout().lock();
        loop {
            let event = tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.next() => event,
            };
            let Some(event) = event else { break };
            write_timestamp(&mut stdout, &opts)?;
            event.print(&mut stdout, format, &opts)?;
            stdout.flush()?;
        }

        debug!("stopping monitor");
        handle.stop().await;
        Ok(())
    }
}

impl Printable for NetworkEvent {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let action = if self.is_new() { "" } else { "Deleted " };
        match self {
            Self::NewLink(link) | Self::DelLink(link) => writeln!(
                w,
                "{}{}: {}: {}",
                action,
                link.index,
                link.name_or("?"),
                format_flags(link.flags)
            ),
            Self::NewAddress(addr) | Self::DelAddress(addr) => match addr.primary() {
                Some(ip) => writeln!(
                    w,
                    "{}{}: {} {}/{}",
                    action,
                    addr.index,
                    if ip.is_ipv4() { "inet" } else { "inet6" },
                    ip,
                    addr.prefix_len
                ),
                None => writeln!(w, "{}{}: address", action, addr.index),
            },
            Self::NewRoute(route) | Self::DelRoute(route) => {
                write!(w, "{}{}", action, route.destination_str())?;
                if let Some(gw) = route.gateway {
                    write!(w, " via {}", gw)?;
                }
                if let Some(oif) = route.oif {
                    write!(w, " dev {}", oif)?;
                }
                if let Some(src) = route.prefsrc {
                    write!(w, " src {}", src)?;
                }
                writeln!(w, " table {}", route.table)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlroute::netlink::{AddressRecord, LinkRecord};

    fn cmd(objects: Vec<EventType>) -> MonitorCmd {
        MonitorCmd {
            objects,
            timestamp: false,
        }
    }

    #[test]
    fn test_listener_groups() {
        let all = cmd(vec![EventType::All]).listener_config();
        assert_eq!(all.groups(), ListenerConfig::new().groups());

        let links = cmd(vec![EventType::Link]).listener_config();
        assert_eq!(links.groups(), ListenerConfig::none().links(true).groups());
    }

    #[test]
    fn test_event_text() {
        let mut out = Vec::new();
        NetworkEvent::DelLink(LinkRecord {
            index: 3,
            name: Some("veth0".to_string()),
            flags: 0,
        })
        .print_text(&mut out)
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Deleted 3: veth0: <>\n");

        let mut out = Vec::new();
        let ip = "5.0.2.4".parse().ok();
        NetworkEvent::NewAddress(AddressRecord {
            index: 1,
            family: 2,
            prefix_len: 32,
            local: ip,
            address: ip,
        })
        .print_text(&mut out)
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1: inet 5.0.2.4/32\n");
    }

    #[test]
    fn test_event_json() {
        let event = NetworkEvent::NewLink(LinkRecord {
            index: 1,
            name: Some("lo".to_string()),
            flags: 0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "NewLink");
        assert_eq!(json["record"]["name"], "lo");
    }
}
