//! nlroute show command.

use std::io::{self, Write};

use clap::{Args, Subcommand};
use nlroute::netlink::{AddressRecord, LinkRecord};
use nlroute::{Connection, Result};
use serde::Serialize;

use crate::output::{OutputFormat, OutputOptions, Printable, format_flags, print_all};

#[derive(Args)]
pub struct ShowCmd {
    #[command(subcommand)]
    what: ShowWhat,
}

#[derive(Subcommand)]
enum ShowWhat {
    /// List interfaces.
    Links,
    /// List addresses.
    Addrs,
}

impl Printable for LinkRecord {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "{}: {}: {}", self.index, self.name_or("?"), format_flags(self.flags))
    }
}

/// An address annotated with its interface name.
#[derive(Debug, Serialize)]
struct AddressLine {
    #[serde(flatten)]
    record: AddressRecord,
    dev: String,
}

impl Printable for AddressLine {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self.record.primary() {
            Some(addr) => {
                let family = if addr.is_ipv4() { "inet" } else { "inet6" };
                writeln!(
                    w,
                    "{}: {} {} {}/{}",
                    self.record.index, self.dev, family, addr, self.record.prefix_len
                )
            }
            None => writeln!(w, "{}: {} family {}", self.record.index, self.dev, self.record.family),
        }
    }
}

impl ShowCmd {
    pub async fn run(self, conn: &Connection, format: OutputFormat, opts: &OutputOptions) -> Result<()> {
        let mut stdout = io::stdout().lock();
        match self.what {
            ShowWhat::Links => {
                let links = conn.get_links().await?;
                print_all(&mut stdout, &links, format, opts)?;
            }
            ShowWhat::Addrs => {
                let names = conn.get_interface_names().await?;
                let lines: Vec<_> = conn
                    .get_addresses()
                    .await?
                    .into_iter()
                    .map(|record| AddressLine {
                        dev: names
                            .get(&record.index)
                            .cloned()
                            .unwrap_or_else(|| record.index.to_string()),
                        record,
                    })
                    .collect();
                print_all(&mut stdout, &lines, format, opts)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_text() {
        let link = LinkRecord {
            index: 1,
            name: Some("lo".to_string()),
            flags: nlroute::netlink::types::link::iff::UP,
        };
        let mut out = Vec::new();
        link.print_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1: lo: <UP>\n");
    }

    #[test]
    fn test_address_line() {
        let addr = "5.0.2.4".parse().ok();
        let line = AddressLine {
            record: AddressRecord {
                index: 1,
                family: 2,
                prefix_len: 32,
                local: addr,
                address: addr,
            },
            dev: "lo".to_string(),
        };

        let mut out = Vec::new();
        line.print_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1: lo inet 5.0.2.4/32\n");

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["dev"], "lo");
        assert_eq!(json["prefix_len"], 32);
    }
}
