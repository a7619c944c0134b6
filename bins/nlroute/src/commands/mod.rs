//! nlroute command implementations.

pub mod addr;
pub mod monitor;
pub mod route;
pub mod rule;
pub mod show;

use std::net::IpAddr;

use nlroute::InterfaceRef;

/// An address with its prefix length, parsed from CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub addr: IpAddr,
    pub len: u8,
}

/// clap value parser for `ADDR[/LEN]`; a bare address is a host prefix.
pub fn parse_prefix(s: &str) -> Result<Prefix, String> {
    nlroute::util::parse_prefix(s)
        .map(|(addr, len)| Prefix { addr, len })
        .map_err(|e| e.to_string())
}

/// Interpret a device argument as an index when it is numeric.
pub fn interface(dev: &str) -> InterfaceRef {
    match dev.parse::<u32>() {
        Ok(index) => InterfaceRef::index(index),
        Err(_) => InterfaceRef::name(dev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix() {
        let p = parse_prefix("10.8.0.0/16").unwrap();
        assert_eq!(p.addr, "10.8.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(p.len, 16);

        assert_eq!(parse_prefix("2001:db8::1").unwrap().len, 128);
        assert!(parse_prefix("10.0.0.0/33").is_err());
        assert!(parse_prefix("nope").is_err());
    }

    #[test]
    fn test_interface() {
        assert_eq!(interface("7"), InterfaceRef::index(7));
        assert_eq!(interface("eth0"), InterfaceRef::name("eth0"));
    }
}
