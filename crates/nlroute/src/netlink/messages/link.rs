//! Link records (RTM_NEWLINK / RTM_DELLINK).

use crate::netlink::attr::{AttrIter, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::{FromNetlink, PResult, parse_header};
use crate::netlink::types::link::{IfInfoMsg, IflaAttr, iff};

/// A network interface decoded from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinkRecord {
    /// Interface index.
    pub index: u32,
    /// Interface name (IFLA_IFNAME).
    pub name: Option<String>,
    /// Device flags (IFF_*).
    pub flags: u32,
}

impl LinkRecord {
    /// Whether the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.flags & iff::UP != 0
    }

    /// Whether this is a loopback device.
    pub fn is_loopback(&self) -> bool {
        self.flags & iff::LOOPBACK != 0
    }

    /// Get the name or a default value.
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }
}

impl FromNetlink for LinkRecord {
    fn write_dump_header(builder: &mut MessageBuilder) -> Result<()> {
        builder.append(&IfInfoMsg::new())
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header: IfInfoMsg = parse_header(input)?;

        let mut record = LinkRecord {
            index: header.ifi_index as u32,
            name: None,
            flags: header.ifi_flags,
        };

        for (attr_type, data) in AttrIter::new(*input) {
            if attr_type == IflaAttr::Ifname as u16 {
                record.name = get::string(data).map(str::to_owned);
            }
        }
        *input = &[];

        Ok(record)
    }
}
