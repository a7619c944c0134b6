//! Message builder for constructing netlink requests in a fixed buffer.

use zerocopy::{Immutable, IntoBytes};

use super::attr::{self, NLA_F_NESTED, NLA_HDRLEN, nla_align};
use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Default request capacity in bytes.
pub const DEFAULT_REQUEST_CAPACITY: usize = 1024;

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
#[derive(Debug, Clone, Copy)]
pub struct NestToken {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
}

/// Builder for a single netlink request.
///
/// The buffer has a fixed capacity chosen at construction. Every append
/// is checked against it, so an oversized request fails with
/// [`Error::BufferTooSmall`] instead of being truncated. The header
/// length always equals the number of bytes encoded so far.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
    len: usize,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self::with_capacity(msg_type, flags, DEFAULT_REQUEST_CAPACITY)
    }

    /// Create a builder whose buffer holds at most `capacity` bytes.
    ///
    /// The capacity is raised to the header size if smaller.
    pub fn with_capacity(msg_type: u16, flags: u16, capacity: usize) -> Self {
        let header = NlMsgHdr::new(msg_type, flags);
        let mut buf = vec![0u8; capacity.max(NLMSG_HDRLEN)];
        buf[..NLMSG_HDRLEN].copy_from_slice(header.as_bytes());
        Self {
            buf,
            len: NLMSG_HDRLEN,
        }
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.len == NLMSG_HDRLEN
    }

    /// Total capacity of the request buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Append a fixed-size family header (rtmsg, ifaddrmsg, ...).
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) -> Result<()> {
        let bytes = data.as_bytes();
        let start = nlmsg_align(self.len);
        let end = start + bytes.len();
        if end > self.buf.len() {
            return Err(Error::BufferTooSmall {
                needed: end,
                capacity: self.buf.len(),
            });
        }
        self.buf[self.len..start].fill(0);
        self.buf[start..end].copy_from_slice(bytes);
        self.set_len(end);
        Ok(())
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        let len = attr::encode(&mut self.buf, self.len, attr_type, data)?;
        self.set_len(len);
        Ok(())
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) -> Result<()> {
        self.append_attr(attr_type, &value.to_ne_bytes())
    }

    /// Append a null-terminated string attribute.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) -> Result<()> {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.append_attr(attr_type, &data)
    }

    /// Start a nested attribute. Returns a token to finalize it.
    pub fn nest_start(&mut self, attr_type: u16) -> Result<NestToken> {
        let offset = nla_align(self.len);
        self.append_attr(attr_type | NLA_F_NESTED, &[])?;
        Ok(NestToken { offset })
    }

    /// End a nested attribute started with `nest_start`.
    pub fn nest_end(&mut self, token: NestToken) {
        let len = (self.len - token.offset) as u16;
        self.buf[token.offset..token.offset + 2].copy_from_slice(&len.to_ne_bytes());
    }

    /// Check whether a nest has received any attributes.
    pub fn nest_is_empty(&self, token: NestToken) -> bool {
        self.len - token.offset == NLA_HDRLEN
    }

    /// Drop a nest (and anything written after it).
    pub fn nest_cancel(&mut self, token: NestToken) {
        self.buf[token.offset..self.len].fill(0);
        self.set_len(token.offset);
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Set the port ID.
    pub fn set_pid(&mut self, pid: u32) {
        self.buf[12..16].copy_from_slice(&pid.to_ne_bytes());
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }

    /// Get the encoded bytes for inspection.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn set_len(&mut self, len: usize) {
        self.len = len;
        self.buf[0..4].copy_from_slice(&(len as u32).to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrIter, NlAttr};
    use crate::netlink::message::NLM_F_REQUEST;

    #[test]
    fn test_simple_message() {
        let msg = MessageBuilder::new(16, NLM_F_REQUEST).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, 16);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
    }

    #[test]
    fn test_length_tracks_encoded_size() {
        let mut builder = MessageBuilder::new(16, NLM_F_REQUEST);
        builder.append_attr(1, &[1, 2, 3]).unwrap();
        assert_eq!(builder.len(), NLMSG_HDRLEN + 7);
        builder.append_attr_u32(2, 7).unwrap();
        assert_eq!(builder.len(), NLMSG_HDRLEN + 8 + 8);

        let msg = builder.finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, msg.len());
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut builder = MessageBuilder::with_capacity(16, NLM_F_REQUEST, NLMSG_HDRLEN + 8);
        builder.append_attr_u32(1, 1).unwrap();
        let err = builder.append_attr(2, &[]).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { needed: 28, capacity: 24 }));
        assert_eq!(builder.len(), NLMSG_HDRLEN + 8);
    }

    #[test]
    fn test_nested_attribute() {
        let mut builder = MessageBuilder::new(24, NLM_F_REQUEST);
        let nest = builder.nest_start(8).unwrap();
        builder.append_attr_u32(2, 1400).unwrap();
        builder.append_attr_u32(8, 1360).unwrap();
        builder.nest_end(nest);
        let msg = builder.finish();

        let header = NlAttr::from_bytes(&msg[NLMSG_HDRLEN..]).unwrap();
        assert!(header.is_nested());
        assert_eq!(header.kind(), 8);

        let (kind, payload) = AttrIter::new(&msg[NLMSG_HDRLEN..]).next().unwrap();
        assert_eq!(kind, 8);
        let inner: Vec<_> = AttrIter::new(payload).map(|(t, _)| t).collect();
        assert_eq!(inner, vec![2, 8]);
    }

    #[test]
    fn test_nest_cancel() {
        let mut builder = MessageBuilder::new(24, NLM_F_REQUEST);
        let nest = builder.nest_start(8).unwrap();
        assert!(builder.nest_is_empty(nest));
        builder.nest_cancel(nest);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_seq_and_pid() {
        let mut builder = MessageBuilder::new(16, NLM_F_REQUEST);
        builder.set_seq(42);
        builder.set_pid(7);
        let header = *NlMsgHdr::from_bytes(builder.as_bytes()).unwrap();
        assert_eq!(header.nlmsg_seq, 42);
        assert_eq!(header.nlmsg_pid, 7);
    }
}
