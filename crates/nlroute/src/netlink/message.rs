//! Netlink message header and parsing.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Create a new message header.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }

    /// Decoded message kind.
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.nlmsg_type)
    }

    /// Check if this is an error message.
    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::ERROR
    }

    /// Check if this is a done message.
    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::DONE
    }

    /// Check if this message has the multi flag.
    pub fn is_multi(&self) -> bool {
        self.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse header from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Standard netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;

    // Link messages
    pub const RTM_NEWLINK: u16 = 16;
    pub const RTM_DELLINK: u16 = 17;
    pub const RTM_GETLINK: u16 = 18;

    // Address messages
    pub const RTM_NEWADDR: u16 = 20;
    pub const RTM_DELADDR: u16 = 21;
    pub const RTM_GETADDR: u16 = 22;

    // Route messages
    pub const RTM_NEWROUTE: u16 = 24;
    pub const RTM_DELROUTE: u16 = 25;
    pub const RTM_GETROUTE: u16 = 26;

    // Rule messages
    pub const RTM_NEWRULE: u16 = 32;
    pub const RTM_DELRULE: u16 = 33;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;

// Modifiers to GET request
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Modifiers to NEW request
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

/// Message type decoded once at the framing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NewLink,
    DelLink,
    NewAddr,
    DelAddr,
    NewRoute,
    DelRoute,
    NewRule,
    DelRule,
    Error,
    Done,
    Unknown(u16),
}

impl From<u16> for MessageKind {
    fn from(raw: u16) -> Self {
        match raw {
            NlMsgType::RTM_NEWLINK => Self::NewLink,
            NlMsgType::RTM_DELLINK => Self::DelLink,
            NlMsgType::RTM_NEWADDR => Self::NewAddr,
            NlMsgType::RTM_DELADDR => Self::DelAddr,
            NlMsgType::RTM_NEWROUTE => Self::NewRoute,
            NlMsgType::RTM_DELROUTE => Self::DelRoute,
            NlMsgType::RTM_NEWRULE => Self::NewRule,
            NlMsgType::RTM_DELRULE => Self::DelRule,
            NlMsgType::ERROR => Self::Error,
            NlMsgType::DONE => Self::Done,
            other => Self::Unknown(other),
        }
    }
}

impl MessageKind {
    /// Raw wire value.
    pub fn raw(self) -> u16 {
        match self {
            Self::NewLink => NlMsgType::RTM_NEWLINK,
            Self::DelLink => NlMsgType::RTM_DELLINK,
            Self::NewAddr => NlMsgType::RTM_NEWADDR,
            Self::DelAddr => NlMsgType::RTM_DELADDR,
            Self::NewRoute => NlMsgType::RTM_NEWROUTE,
            Self::DelRoute => NlMsgType::RTM_DELROUTE,
            Self::NewRule => NlMsgType::RTM_NEWRULE,
            Self::DelRule => NlMsgType::RTM_DELRULE,
            Self::Error => NlMsgType::ERROR,
            Self::Done => NlMsgType::DONE,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Iterator over netlink messages in a buffer.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a NlMsgHdr, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }

        let header = match NlMsgHdr::from_bytes(self.data) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        let msg_len = header.nlmsg_len as usize;
        if msg_len < NLMSG_HDRLEN || msg_len > self.data.len() {
            self.data = &[];
            return Some(Err(Error::InvalidMessage(format!(
                "invalid message length: {}",
                msg_len
            ))));
        }

        let payload = &self.data[NLMSG_HDRLEN..msg_len];
        let aligned_len = nlmsg_align(msg_len);

        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok((header, payload)))
    }
}

/// Netlink error message payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Error code (negative errno or 0 for ACK).
    pub error: i32,
    /// Original message header that caused the error.
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    /// Parse error message from payload.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(msg_type: u16, flags: u16, payload: &[u8]) -> Vec<u8> {
        let mut hdr = NlMsgHdr::new(msg_type, flags);
        hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;
        let mut buf = hdr.as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf
    }

    #[test]
    fn test_kind_round_trip() {
        for raw in [2u16, 3, 16, 17, 20, 21, 24, 25, 32, 33, 99] {
            assert_eq!(MessageKind::from(raw).raw(), raw);
        }
        assert_eq!(MessageKind::from(18), MessageKind::Unknown(18));
        assert_eq!(MessageKind::from(24), MessageKind::NewRoute);
    }

    #[test]
    fn test_iter_multiple_records() {
        let mut buf = record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[1, 2, 3]);
        buf.extend(record(NlMsgType::DONE, NLM_F_MULTI, &[0; 4]));

        let records: Vec<_> = MessageIter::new(&buf).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0.kind(), MessageKind::NewLink);
        assert_eq!(records[0].1, &[1, 2, 3]);
        assert!(records[1].0.is_done());
    }

    #[test]
    fn test_iter_rejects_bad_length() {
        let mut buf = record(NlMsgType::RTM_NEWLINK, 0, &[]);
        buf[0..4].copy_from_slice(&64u32.to_ne_bytes());
        let mut iter = MessageIter::new(&buf);
        assert!(matches!(iter.next(), Some(Err(Error::InvalidMessage(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_error_payload() {
        let err = NlMsgError {
            error: -16,
            msg: NlMsgHdr::default(),
        };
        let buf = record(NlMsgType::ERROR, 0, err.as_bytes());
        let (hdr, payload) = MessageIter::new(&buf).next().unwrap().unwrap();
        assert!(hdr.is_error());
        let parsed = NlMsgError::from_bytes(payload).unwrap();
        assert_eq!(parsed.error, -16);
        assert!(!parsed.is_ack());
    }
}
