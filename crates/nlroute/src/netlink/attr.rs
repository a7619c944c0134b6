//! Netlink attribute (rtattr) encoding and decoding.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Netlink attribute header (mirrors struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header, excluding trailing padding.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Append one attribute to `buf`, whose logical length is `len`.
///
/// The attribute is placed at the next 4-byte boundary and the returned
/// length is `aligned + 4 + payload.len()`, without trailing padding. The
/// capacity is `buf.len()`; when the attribute does not fit, nothing is
/// written and [`Error::BufferTooSmall`] is returned.
pub fn encode(buf: &mut [u8], len: usize, attr_type: u16, payload: &[u8]) -> Result<usize> {
    let aligned = nla_align(len);
    let needed = aligned + NLA_HDRLEN + payload.len();
    if needed > buf.len() || NLA_HDRLEN + payload.len() > u16::MAX as usize {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: buf.len(),
        });
    }

    // Padding between the previous attribute and this one is zeroed.
    buf[len..aligned].fill(0);
    let header = NlAttr::new(attr_type, payload.len());
    buf[aligned..aligned + NLA_HDRLEN].copy_from_slice(header.as_bytes());
    buf[aligned + NLA_HDRLEN..needed].copy_from_slice(payload);
    Ok(needed)
}

/// Iterator over netlink attributes in a buffer.
///
/// Iteration is lazy and stops at the first truncated or malformed header.
/// Cloning the iterator restarts from the same position.
#[derive(Debug, Clone)]
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = NlAttr::from_bytes(self.data).ok()?;

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            self.data = &[];
            return None;
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr.kind(), payload))
    }
}

/// Typed accessors for attribute payloads.
///
/// Fixed-width values decode only when the payload has exactly that width;
/// anything else yields `None` so the caller can skip the attribute.
pub mod get {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Option<u8> {
        <[u8; 1]>::try_from(data).ok().map(|b| b[0])
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Option<u32> {
        data.try_into().ok().map(u32::from_ne_bytes)
    }

    /// Extract a u32 value (big endian / network order).
    pub fn u32_be(data: &[u8]) -> Option<u32> {
        data.try_into().ok().map(u32::from_be_bytes)
    }

    /// Extract an IPv4 or IPv6 address from a 4- or 16-byte payload.
    pub fn ip(data: &[u8]) -> Option<IpAddr> {
        match data.len() {
            4 => <[u8; 4]>::try_from(data)
                .ok()
                .map(|b| IpAddr::V4(Ipv4Addr::from(b))),
            16 => <[u8; 16]>::try_from(data)
                .ok()
                .map(|b| IpAddr::V6(Ipv6Addr::from(b))),
            _ => None,
        }
    }

    /// Extract a null-terminated string.
    pub fn string(data: &[u8]) -> Option<&str> {
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len]).ok()
    }
}
