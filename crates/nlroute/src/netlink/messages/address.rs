//! Address records (RTM_NEWADDR / RTM_DELADDR).

use std::net::IpAddr;

use crate::netlink::attr::AttrIter;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::{FromNetlink, PResult, parse_header};
use crate::netlink::types::addr::{IfAddrMsg, IfaAttr};

use super::ip_for_family;

/// An interface address decoded from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AddressRecord {
    /// Interface index.
    pub index: u32,
    /// Address family.
    pub family: u8,
    /// Prefix length.
    pub prefix_len: u8,
    /// Local address (IFA_LOCAL).
    pub local: Option<IpAddr>,
    /// Peer or broadcast-domain address (IFA_ADDRESS).
    pub address: Option<IpAddr>,
}

impl AddressRecord {
    /// The address this host owns on the interface.
    ///
    /// On point-to-point links IFA_ADDRESS is the peer, so IFA_LOCAL wins
    /// when both are present.
    pub fn primary(&self) -> Option<IpAddr> {
        self.local.or(self.address)
    }

    /// Peer address, present only when it differs from the local address.
    pub fn peer(&self) -> Option<IpAddr> {
        match (self.local, self.address) {
            (Some(local), Some(addr)) if local != addr => Some(addr),
            _ => None,
        }
    }
}

impl FromNetlink for AddressRecord {
    fn write_dump_header(builder: &mut MessageBuilder) -> Result<()> {
        builder.append(&IfAddrMsg::new())
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header: IfAddrMsg = parse_header(input)?;

        let mut record = AddressRecord {
            index: header.ifa_index,
            family: header.ifa_family,
            prefix_len: header.ifa_prefixlen,
            local: None,
            address: None,
        };

        for (attr_type, data) in AttrIter::new(*input) {
            match attr_type {
                t if t == IfaAttr::Local as u16 => {
                    record.local = ip_for_family(data, header.ifa_family).or(record.local);
                }
                t if t == IfaAttr::Address as u16 => {
                    record.address = ip_for_family(data, header.ifa_family).or(record.address);
                }
                _ => {}
            }
        }
        *input = &[];

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr;
    use zerocopy::IntoBytes;

    fn payload(header: IfAddrMsg, attrs: &[(u16, &[u8])]) -> Vec<u8> {
        let mut buf = vec![0u8; 128];
        buf[..IfAddrMsg::SIZE].copy_from_slice(header.as_bytes());
        let mut len = IfAddrMsg::SIZE;
        for (t, data) in attrs {
            len = attr::encode(&mut buf, len, *t, data).unwrap();
        }
        buf.truncate(len);
        buf
    }

    #[test]
    fn test_parse_address() {
        let header = IfAddrMsg::new()
            .with_family(libc::AF_INET as u8)
            .with_prefixlen(24)
            .with_index(3);
        let data = payload(
            header,
            &[
                (IfaAttr::Address as u16, &[192, 168, 1, 10]),
                (IfaAttr::Local as u16, &[192, 168, 1, 10]),
            ],
        );
        let record = AddressRecord::from_bytes(&data).unwrap();
        assert_eq!(record.index, 3);
        assert_eq!(record.prefix_len, 24);
        assert_eq!(record.primary(), Some("192.168.1.10".parse().unwrap()));
        assert_eq!(record.peer(), None);
    }

    #[test]
    fn test_point_to_point_peer() {
        let header = IfAddrMsg::new().with_family(libc::AF_INET as u8).with_index(5);
        let data = payload(
            header,
            &[
                (IfaAttr::Local as u16, &[10, 1, 0, 1]),
                (IfaAttr::Address as u16, &[10, 1, 0, 2]),
            ],
        );
        let record = AddressRecord::from_bytes(&data).unwrap();
        assert_eq!(record.primary(), Some("10.1.0.1".parse().unwrap()));
        assert_eq!(record.peer(), Some("10.1.0.2".parse().unwrap()));
    }

    #[test]
    fn test_address_only_falls_back() {
        let header = IfAddrMsg::new().with_family(libc::AF_INET6 as u8).with_index(1);
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        let data = payload(header, &[(IfaAttr::Address as u16, &v6)]);
        let record = AddressRecord::from_bytes(&data).unwrap();
        assert_eq!(record.local, None);
        assert_eq!(record.primary(), Some("::1".parse().unwrap()));
    }
}
