//! High-level netlink connection with request/response handling.
//!
//! Every exchange runs under an async mutex: the request gets a fresh
//! sequence number, is sent, and replies are collected until the matching
//! multi-part response is complete. A leading `-EBUSY` error record causes
//! the same request (same sequence number) to be sent again, up to the
//! configured number of transmissions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::builder::MessageBuilder;
use super::config::ConnectionConfig;
use super::error::{Error, Result, errno};
use super::message::{
    MessageIter, MessageKind, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgError,
    NlMsgHdr, NlMsgType, nlmsg_align,
};
use super::messages::{AddressRecord, LinkRecord};
use super::parse::FromNetlink;
use super::socket::NetlinkSocket;
use super::transport::Transport;

/// A complete reply: every record that carried the request's sequence
/// number, concatenated in arrival order up to the terminating record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    data: Vec<u8>,
}

impl Response {
    /// Wrap already reassembled bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Total length of the reassembled records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no record was collected.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw reassembled bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Iterate over the records.
    pub fn records(&self) -> MessageIter<'_> {
        MessageIter::new(&self.data)
    }

    /// Kind of the first record.
    pub fn leading_kind(&self) -> Option<MessageKind> {
        NlMsgHdr::from_bytes(&self.data).ok().map(NlMsgHdr::kind)
    }

    /// Error code of the first record, if it is an error record.
    pub fn leading_error(&self) -> Option<i32> {
        let (header, payload) = self.records().next()?.ok()?;
        if !header.is_error() {
            return None;
        }
        NlMsgError::from_bytes(payload).ok().map(|e| e.error)
    }

    /// Interpret the response as the acknowledgement of a change request.
    ///
    /// Records before the error record are skipped. A zero error code is
    /// success; any other code is classified. Reaching DONE or the end
    /// without an error record is [`Error::NotAcknowledged`].
    pub fn ack(&self) -> Result<()> {
        for result in self.records() {
            let (header, payload) = result?;
            match header.kind() {
                MessageKind::Error => {
                    let err = NlMsgError::from_bytes(payload)?;
                    if err.is_ack() {
                        return Ok(());
                    }
                    return Err(Error::from_errno(err.error));
                }
                MessageKind::Done => break,
                _ => continue,
            }
        }
        Err(Error::NotAcknowledged)
    }

    /// Check a dump response and return the payloads of `expected` records.
    ///
    /// The leading record must be an error, DONE, or of the expected kind;
    /// a non-zero error record anywhere fails the dump.
    pub fn dump_payloads(&self, expected: MessageKind) -> Result<Vec<&[u8]>> {
        match self.leading_kind() {
            Some(MessageKind::Error | MessageKind::Done) => {}
            Some(kind) if kind == expected => {}
            _ => return Err(Error::NotAcknowledged),
        }

        let mut payloads = Vec::new();
        for result in self.records() {
            let (header, payload) = result?;
            match header.kind() {
                MessageKind::Error => {
                    let err = NlMsgError::from_bytes(payload)?;
                    if !err.is_ack() {
                        return Err(Error::from_errno(err.error));
                    }
                }
                MessageKind::Done => break,
                kind if kind == expected => payloads.push(payload),
                _ => {}
            }
        }
        Ok(payloads)
    }
}

/// rtnetlink connection over a [`Transport`].
pub struct Connection<T: Transport = NetlinkSocket> {
    transport: T,
    seq: AtomicU32,
    exchange: Mutex<()>,
    config: ConnectionConfig,
}

impl Connection<NetlinkSocket> {
    /// Open a routing socket with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(ConnectionConfig::default())
    }

    /// Open a routing socket with the given settings.
    pub fn with_config(config: ConnectionConfig) -> Result<Self> {
        let socket = NetlinkSocket::with_recv_buffer(config.recv_buffer)?;
        Ok(Self::from_transport(socket, config))
    }
}

impl<T: Transport> Connection<T> {
    /// Build a connection on top of an existing transport.
    pub fn from_transport(transport: T, config: ConnectionConfig) -> Self {
        Self {
            transport,
            seq: AtomicU32::new(1),
            exchange: Mutex::new(()),
            config,
        }
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a request sized to the configured request capacity.
    pub fn message(&self, msg_type: u16, flags: u16) -> MessageBuilder {
        MessageBuilder::with_capacity(msg_type, flags, self.config.request_capacity)
    }

    /// Start a request that expects an acknowledgement.
    pub fn ack_request(&self, msg_type: u16, extra_flags: u16) -> MessageBuilder {
        self.message(msg_type, NLM_F_REQUEST | NLM_F_ACK | extra_flags)
    }

    /// Start a dump request.
    pub fn dump_request(&self, msg_type: u16) -> MessageBuilder {
        self.message(msg_type, NLM_F_REQUEST | NLM_F_DUMP)
    }

    /// Send a request and wait for its complete response.
    ///
    /// Retransmits on a leading `-EBUSY` record. Fails with
    /// [`Error::RetryExhausted`] once the budget is spent, and with
    /// [`Error::Timeout`] if a reply datagram does not arrive in time.
    pub async fn request(&self, mut builder: MessageBuilder) -> Result<Response> {
        let _exchange = self.exchange.lock().await;

        let seq = self.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.transport.port_id());
        let msg = builder.finish();

        let attempts = self.config.retries;
        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!(seq, attempt, "retransmitting netlink request");
            }
            self.transport.send(&msg).await?;

            let response = self.reassemble(seq).await?;
            if response.leading_error() == Some(-errno::EBUSY) {
                continue;
            }
            return Ok(response);
        }

        Err(Error::RetryExhausted { attempts })
    }

    /// Send a request that expects an ACK only (no data response).
    pub async fn request_ack(&self, builder: MessageBuilder) -> Result<()> {
        self.request(builder).await?.ack()
    }

    /// Send a dump request and validate the response against `expected`.
    pub async fn dump(&self, builder: MessageBuilder, expected: MessageKind) -> Result<Response> {
        let response = self.request(builder).await?;
        response.dump_payloads(expected)?;
        Ok(response)
    }

    /// Dump records of type `R`, handing each one to `f` without retaining it.
    ///
    /// Records that fail to parse are skipped.
    pub async fn dump_each<R, F>(
        &self,
        msg_type: u16,
        expected: MessageKind,
        mut f: F,
    ) -> Result<()>
    where
        R: FromNetlink,
        F: FnMut(R),
    {
        let mut builder = self.dump_request(msg_type);
        R::write_dump_header(&mut builder)?;

        let response = self.request(builder).await?;
        for payload in response.dump_payloads(expected)? {
            match R::from_bytes(payload) {
                Ok(record) => f(record),
                Err(e) => debug!(error = %e, "skipping undecodable record"),
            }
        }
        Ok(())
    }

    /// Dump records of type `R` into a vector.
    pub async fn dump_typed<R: FromNetlink>(
        &self,
        msg_type: u16,
        expected: MessageKind,
    ) -> Result<Vec<R>> {
        let mut out = Vec::new();
        self.dump_each(msg_type, expected, |r| out.push(r)).await?;
        Ok(out)
    }

    /// Receive datagrams until the response for `seq` is complete.
    async fn reassemble(&self, seq: u32) -> Result<Response> {
        let timeout = self.config.timeout;
        let mut data = Vec::new();

        loop {
            let datagram = tokio::time::timeout(timeout, self.transport.recv())
                .await
                .map_err(|_| Error::Timeout(timeout))??;

            if datagram.sender != 0 {
                debug!(sender = datagram.sender, "ignoring datagram not sent by kernel");
                continue;
            }

            for result in MessageIter::new(&datagram.data) {
                let (header, payload) = match result {
                    Ok(record) => record,
                    Err(e) => {
                        debug!(error = %e, "dropping rest of malformed datagram");
                        break;
                    }
                };

                if header.nlmsg_seq != seq {
                    debug!(
                        expected = seq,
                        got = header.nlmsg_seq,
                        "discarding stale netlink record"
                    );
                    continue;
                }

                let start = data.len();
                data.extend_from_slice(header.as_bytes());
                data.extend_from_slice(payload);
                data.resize(start + nlmsg_align(NLMSG_HDRLEN + payload.len()), 0);
                trace!(seq, kind = ?header.kind(), len = header.nlmsg_len, "queued record");

                if header.is_done() || !header.is_multi() {
                    return Ok(Response::from_bytes(data));
                }
            }
        }
    }
}

// ============================================================================
// Startup enumeration
// ============================================================================

impl<T: Transport> Connection<T> {
    /// Dump all interfaces, handing each decoded link to `f`.
    pub async fn for_each_link<F: FnMut(LinkRecord)>(&self, f: F) -> Result<()> {
        self.dump_each(NlMsgType::RTM_GETLINK, MessageKind::NewLink, f)
            .await
    }

    /// Dump all addresses, handing each decoded address to `f`.
    pub async fn for_each_address<F: FnMut(AddressRecord)>(&self, f: F) -> Result<()> {
        self.dump_each(NlMsgType::RTM_GETADDR, MessageKind::NewAddr, f)
            .await
    }

    /// Get all network interfaces.
    pub async fn get_links(&self) -> Result<Vec<LinkRecord>> {
        self.dump_typed(NlMsgType::RTM_GETLINK, MessageKind::NewLink)
            .await
    }

    /// Get all IP addresses.
    pub async fn get_addresses(&self) -> Result<Vec<AddressRecord>> {
        self.dump_typed(NlMsgType::RTM_GETADDR, MessageKind::NewAddr)
            .await
    }

    /// Build an ifindex to name map.
    pub async fn get_interface_names(&self) -> Result<HashMap<u32, String>> {
        let mut names = HashMap::new();
        self.for_each_link(|link| {
            if let Some(name) = link.name {
                names.insert(link.index, name);
            }
        })
        .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::netlink::message::NLM_F_MULTI;
    use crate::netlink::types::link::iff;
    use crate::testing::{ScriptedTransport, ack, address, done, link, record};

    fn conn(transport: ScriptedTransport) -> Connection<ScriptedTransport> {
        Connection::from_transport(transport, ConnectionConfig::default())
    }

    #[tokio::test]
    async fn test_ack_success() {
        let conn = conn(
            ScriptedTransport::new()
                .with_port_id(31337)
                .reply(vec![ack(0)]),
        );
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        conn.request_ack(builder).await.unwrap();

        let sent = conn.transport().sent();
        assert_eq!(sent.len(), 1);
        let header = NlMsgHdr::from_bytes(&sent[0]).unwrap();
        assert_eq!(header.nlmsg_seq, 1);
        assert_eq!(header.nlmsg_pid, 31337);
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase() {
        let conn = conn(
            ScriptedTransport::new()
                .reply(vec![ack(0)])
                .reply(vec![ack(0)]),
        );
        for _ in 0..2 {
            let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
            conn.request_ack(builder).await.unwrap();
        }
        let seqs: Vec<u32> = conn
            .transport()
            .sent()
            .iter()
            .map(|m| NlMsgHdr::from_bytes(m).unwrap().nlmsg_seq)
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stale_records_are_skipped() {
        let stale = record(NlMsgType::RTM_NEWLINK, 0, &[0; 16]).with_seq(99);
        let conn = conn(ScriptedTransport::new().reply(vec![stale, ack(0)]));
        let builder = conn.ack_request(NlMsgType::RTM_NEWADDR, 0);
        conn.request_ack(builder).await.unwrap();
    }

    #[tokio::test]
    async fn test_ack_skips_leading_data_records() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            record(NlMsgType::RTM_NEWROUTE, NLM_F_MULTI, &[0; 12]),
            ack(-17),
        ]));
        let builder = conn.ack_request(NlMsgType::RTM_NEWROUTE, 0);
        let err = conn.request_ack(builder).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_done_without_error_is_not_acknowledged() {
        let conn = conn(ScriptedTransport::new().reply(vec![done()]));
        let builder = conn.ack_request(NlMsgType::RTM_NEWROUTE, 0);
        let err = conn.request_ack(builder).await.unwrap_err();
        assert!(matches!(err, Error::NotAcknowledged));
    }

    #[tokio::test]
    async fn test_dump_rejects_unexpected_leading_record() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[0; 16]),
            done(),
        ]));
        let builder = conn.dump_request(NlMsgType::RTM_GETROUTE);
        let err = conn.dump(builder, MessageKind::NewRoute).await.unwrap_err();
        assert!(matches!(err, Error::NotAcknowledged));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_configurable() {
        let transport = ScriptedTransport::new();
        let conn = Connection::from_transport(
            transport,
            ConnectionConfig::new().timeout(Duration::from_millis(50)),
        );
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        match conn.request_ack(builder).await {
            Err(Error::Timeout(t)) => assert_eq!(t, Duration::from_millis(50)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_response_leading_error() {
        let mut bytes = ack(-16).encode(5);
        bytes.extend(done().encode(5));
        let response = Response::from_bytes(bytes);
        assert_eq!(response.leading_kind(), Some(MessageKind::Error));
        assert_eq!(response.leading_error(), Some(-16));
    }

    #[tokio::test]
    async fn test_link_dump_callback() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            link(NlMsgType::RTM_NEWLINK, 1, "lo", iff::UP | iff::LOOPBACK).with_flags(NLM_F_MULTI),
            link(NlMsgType::RTM_NEWLINK, 2, "eth0", 0).with_flags(NLM_F_MULTI),
            done(),
        ]));

        let mut seen = Vec::new();
        conn.for_each_link(|link| seen.push((link.index, link.is_up())))
            .await
            .unwrap();
        assert_eq!(seen, vec![(1, true), (2, false)]);

        let sent = conn.transport().sent();
        let header = NlMsgHdr::from_bytes(&sent[0]).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETLINK);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST | NLM_F_DUMP);
    }

    #[tokio::test]
    async fn test_address_dump() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            address(NlMsgType::RTM_NEWADDR, 1, "127.0.0.1".parse().unwrap(), 8)
                .with_flags(NLM_F_MULTI),
            done(),
        ]));
        let addrs = conn.get_addresses().await.unwrap();
        assert_eq!(addrs.len(), 1);
        assert_eq!(addrs[0].index, 1);
        assert_eq!(addrs[0].primary(), Some("127.0.0.1".parse().unwrap()));
    }
}
