//! Address parsing and prefix utilities.

use std::net::IpAddr;

/// Error type for address parsing.
#[derive(Debug, thiserror::Error)]
pub enum AddrError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid prefix length: {0}")]
    InvalidPrefix(String),
}

pub type Result<T> = std::result::Result<T, AddrError>;

/// Parse an IP address from string.
pub fn parse_addr(s: &str) -> Result<IpAddr> {
    s.parse()
        .map_err(|_| AddrError::InvalidAddress(s.to_string()))
}

/// Parse an IP address with prefix length (CIDR notation).
/// Returns (address, prefix_length); a bare address is a host prefix.
pub fn parse_prefix(s: &str) -> Result<(IpAddr, u8)> {
    if let Some((addr_str, prefix_str)) = s.split_once('/') {
        let addr = parse_addr(addr_str)?;
        let prefix: u8 = prefix_str
            .parse()
            .map_err(|_| AddrError::InvalidPrefix(prefix_str.to_string()))?;

        if prefix > max_prefix(&addr) {
            return Err(AddrError::InvalidPrefix(format!(
                "{} exceeds maximum {} for address family",
                prefix,
                max_prefix(&addr)
            )));
        }

        Ok((addr, prefix))
    } else {
        let addr = parse_addr(s)?;
        Ok((addr, max_prefix(&addr)))
    }
}

/// Full prefix width for the address family (32 or 128).
pub fn max_prefix(addr: &IpAddr) -> u8 {
    if addr.is_ipv4() { 32 } else { 128 }
}

/// Check whether `addr` lies inside `net/prefix_len`.
///
/// Addresses of different families never match.
pub fn prefix_contains(net: IpAddr, prefix_len: u8, addr: IpAddr) -> bool {
    match (net, addr) {
        (IpAddr::V4(net), IpAddr::V4(a)) => {
            let len = u32::from(prefix_len.min(32));
            let mask = u32::MAX.checked_shl(32 - len).unwrap_or(0);
            u32::from(net) & mask == u32::from(a) & mask
        }
        (IpAddr::V6(net), IpAddr::V6(a)) => {
            let len = u32::from(prefix_len.min(128));
            let mask = u128::MAX.checked_shl(128 - len).unwrap_or(0);
            u128::from(net) & mask == u128::from(a) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix() {
        let (addr, prefix) = parse_prefix("192.168.1.0/24").unwrap();
        assert_eq!(addr.to_string(), "192.168.1.0");
        assert_eq!(prefix, 24);

        let (_, prefix) = parse_prefix("5.0.2.4").unwrap();
        assert_eq!(prefix, 32);

        let (_, prefix) = parse_prefix("2001:db8::1").unwrap();
        assert_eq!(prefix, 128);

        assert!(parse_prefix("10.0.0.0/33").is_err());
        assert!(parse_prefix("10.0.0/8").is_err());
    }

    #[test]
    fn test_prefix_contains() {
        let net: IpAddr = "10.0.0.0".parse().unwrap();
        assert!(prefix_contains(net, 8, "10.200.3.4".parse().unwrap()));
        assert!(!prefix_contains(net, 16, "10.1.0.1".parse().unwrap()));
        assert!(prefix_contains(net, 0, "1.2.3.4".parse().unwrap()));
        assert!(prefix_contains(
            "2001:db8::".parse().unwrap(),
            32,
            "2001:db8:1::5".parse().unwrap()
        ));
        assert!(!prefix_contains(net, 0, "::1".parse().unwrap()));
    }
}
