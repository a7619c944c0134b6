//! Scripted transport for driving [`Connection`] without a kernel.
//!
//! Enabled with the `testing` feature.
//!
//! ```ignore
//! use nlroute::netlink::{Connection, ConnectionConfig, rule::RuleBuilder};
//! use nlroute::testing::{ScriptedTransport, ack};
//!
//! let transport = ScriptedTransport::new()
//!     .reply(vec![ack(-16)])
//!     .reply(vec![ack(0)]);
//! let conn = Connection::from_transport(transport, ConnectionConfig::default());
//! conn.add_rule(RuleBuilder::v4(100)).await?;
//! assert_eq!(conn.transport().sent().len(), 2);
//! ```
//!
//! Replies are delivered one datagram per `recv`. Records without an
//! explicit sequence number are stamped with the sequence number of the
//! most recently sent request. Once the script is exhausted `recv` never
//! completes, so the engine's receive timeout fires.
//!
//! [`Connection`]: crate::netlink::Connection

use std::collections::VecDeque;
use std::io;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use zerocopy::IntoBytes;

use crate::netlink::attr::{NlAttr, nla_align};
use crate::netlink::message::{NLM_F_MULTI, NLMSG_HDRLEN, NlMsgError, NlMsgHdr, NlMsgType, nlmsg_align};
use crate::netlink::messages::{family_of, octets};
use crate::netlink::types::addr::{IfAddrMsg, IfaAttr};
use crate::netlink::types::link::{IfInfoMsg, IflaAttr};
use crate::netlink::types::route::{RouteScope, RouteType, RtMsg, RtaAttr, rt_table};
use crate::netlink::{Datagram, Transport};
use crate::netlink::{Error, Result};

/// Port id reported by [`ScriptedTransport`] unless overridden.
pub const SCRIPTED_PORT_ID: u32 = 4242;

/// One netlink record in a scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRecord {
    msg_type: u16,
    flags: u16,
    seq: Option<u32>,
    payload: Vec<u8>,
}

impl ScriptedRecord {
    /// Force a specific sequence number instead of echoing the request's.
    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Replace the header flags (e.g. add `NLM_F_MULTI` for dump replies).
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Encode the record, using `seq` unless one was forced.
    pub fn encode(&self, seq: u32) -> Vec<u8> {
        let mut header = NlMsgHdr::new(self.msg_type, self.flags);
        header.nlmsg_len = (NLMSG_HDRLEN + self.payload.len()) as u32;
        header.nlmsg_seq = self.seq.unwrap_or(seq);
        let mut buf = header.as_bytes().to_vec();
        buf.extend_from_slice(&self.payload);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf
    }
}

/// A record with arbitrary type, flags and payload.
pub fn record(msg_type: u16, flags: u16, payload: &[u8]) -> ScriptedRecord {
    ScriptedRecord {
        msg_type,
        flags,
        seq: None,
        payload: payload.to_vec(),
    }
}

/// An error record carrying `error` (0 for a plain acknowledgement,
/// otherwise a negative errno).
pub fn ack(error: i32) -> ScriptedRecord {
    let err = NlMsgError {
        error,
        msg: NlMsgHdr::default(),
    };
    record(NlMsgType::ERROR, 0, err.as_bytes())
}

/// A DONE record terminating a multi-part reply.
pub fn done() -> ScriptedRecord {
    record(NlMsgType::DONE, NLM_F_MULTI, &0i32.to_ne_bytes())
}

/// A main-table unicast route record (`RTM_NEWROUTE`, multi-part).
pub fn route(
    destination: IpAddr,
    prefix_len: u8,
    prefsrc: Option<IpAddr>,
    gateway: Option<IpAddr>,
) -> ScriptedRecord {
    let header = RtMsg::new()
        .with_family(family_of(&destination))
        .with_dst_len(prefix_len)
        .with_table(u32::from(rt_table::MAIN))
        .with_scope(if gateway.is_some() {
            RouteScope::Universe
        } else {
            RouteScope::Link
        })
        .with_type(RouteType::Unicast);
    let mut attrs = vec![(RtaAttr::Dst as u16, octets(&destination))];
    if let Some(src) = prefsrc {
        attrs.push((RtaAttr::Prefsrc as u16, octets(&src)));
    }
    if let Some(gw) = gateway {
        attrs.push((RtaAttr::Gateway as u16, octets(&gw)));
    }
    record(
        NlMsgType::RTM_NEWROUTE,
        NLM_F_MULTI,
        &with_attrs(header.as_bytes(), &attrs),
    )
}

/// An address record of type `msg_type` (`RTM_NEWADDR` or `RTM_DELADDR`).
pub fn address(msg_type: u16, index: u32, local: IpAddr, prefix_len: u8) -> ScriptedRecord {
    let header = IfAddrMsg::new()
        .with_family(family_of(&local))
        .with_prefixlen(prefix_len)
        .with_index(index);
    let attrs = [
        (IfaAttr::Local as u16, octets(&local)),
        (IfaAttr::Address as u16, octets(&local)),
    ];
    record(msg_type, 0, &with_attrs(header.as_bytes(), &attrs))
}

/// A link record of type `msg_type` (`RTM_NEWLINK` or `RTM_DELLINK`).
pub fn link(msg_type: u16, index: u32, name: &str, flags: u32) -> ScriptedRecord {
    let mut header = IfInfoMsg::new();
    header.ifi_index = index as i32;
    header.ifi_flags = flags;
    let mut ifname = name.as_bytes().to_vec();
    ifname.push(0);
    let attrs = [(IflaAttr::Ifname as u16, ifname)];
    record(msg_type, 0, &with_attrs(header.as_bytes(), &attrs))
}

fn with_attrs(header: &[u8], attrs: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut buf = header.to_vec();
    for (kind, data) in attrs {
        buf.resize(nla_align(buf.len()), 0);
        buf.extend_from_slice(NlAttr::new(*kind, data.len()).as_bytes());
        buf.extend_from_slice(data);
    }
    buf
}

#[derive(Debug)]
enum Scripted {
    Records { sender: u32, records: Vec<ScriptedRecord> },
    Failure(io::ErrorKind),
    Overflow { received: usize, capacity: usize },
}

/// In-memory [`Transport`] that replays a script of replies.
#[derive(Debug)]
pub struct ScriptedTransport {
    port_id: u32,
    replies: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<Vec<u8>>>,
    last_seq: AtomicU32,
    send_failure: Option<io::ErrorKind>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            port_id: SCRIPTED_PORT_ID,
            replies: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            last_seq: AtomicU32::new(0),
            send_failure: None,
        }
    }

    /// Report a different port id.
    pub fn with_port_id(mut self, port_id: u32) -> Self {
        self.port_id = port_id;
        self
    }

    /// Queue one datagram from the kernel holding `records`.
    pub fn reply(self, records: Vec<ScriptedRecord>) -> Self {
        self.reply_from(0, records)
    }

    /// Queue one datagram that claims to come from `sender`.
    pub fn reply_from(self, sender: u32, records: Vec<ScriptedRecord>) -> Self {
        self.push(Scripted::Records { sender, records });
        self
    }

    /// Queue a receive error.
    pub fn recv_failure(self, kind: io::ErrorKind) -> Self {
        self.push(Scripted::Failure(kind));
        self
    }

    /// Queue a datagram of `received` bytes that did not fit a receive
    /// buffer of `capacity` bytes.
    pub fn overflow(self, received: usize, capacity: usize) -> Self {
        self.push(Scripted::Overflow { received, capacity });
        self
    }

    /// Make every send fail with `kind`.
    pub fn send_failure(mut self, kind: io::ErrorKind) -> Self {
        self.send_failure = Some(kind);
        self
    }

    /// Every message sent so far, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of replies not yet delivered.
    pub fn pending_replies(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, item: Scripted) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    fn next_reply(&self) -> Option<Scripted> {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

impl Transport for ScriptedTransport {
    fn port_id(&self) -> u32 {
        self.port_id
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        if let Some(kind) = self.send_failure {
            return Err(Error::TransmitFailure(io::Error::from(kind)));
        }
        if let Ok(header) = NlMsgHdr::from_bytes(msg) {
            self.last_seq.store(header.nlmsg_seq, Ordering::SeqCst);
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(msg.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Datagram> {
        match self.next_reply() {
            Some(Scripted::Records { sender, records }) => {
                let seq = self.last_seq.load(Ordering::SeqCst);
                let data = records.iter().flat_map(|r| r.encode(seq)).collect();
                Ok(Datagram { data, sender })
            }
            Some(Scripted::Failure(kind)) => Err(Error::Io(io::Error::from(kind))),
            Some(Scripted::Overflow { received, capacity }) => {
                Err(Error::BufferOverflow { received, capacity })
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_encoding() {
        let bytes = ack(-17).with_seq(9).encode(1);
        let header = NlMsgHdr::from_bytes(&bytes).unwrap();
        assert_eq!(header.nlmsg_seq, 9);
        assert_eq!(header.nlmsg_len as usize, bytes.len());
        assert!(header.is_error());

        let bytes = done().encode(3);
        assert_eq!(NlMsgHdr::from_bytes(&bytes).unwrap().nlmsg_seq, 3);
    }

    #[tokio::test]
    async fn test_replies_echo_last_sequence() {
        let transport = ScriptedTransport::new().reply(vec![ack(0)]);
        let mut request = NlMsgHdr::new(NlMsgType::RTM_NEWADDR, 0);
        request.nlmsg_seq = 77;
        transport.send(request.as_bytes()).await.unwrap();

        let datagram = transport.recv().await.unwrap();
        assert_eq!(datagram.sender, 0);
        assert_eq!(NlMsgHdr::from_bytes(&datagram.data).unwrap().nlmsg_seq, 77);
        assert_eq!(transport.pending_replies(), 0);
    }
}
