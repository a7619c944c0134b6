//! Request engine tests against a scripted kernel.
//!
//! Run with the `testing` feature:
//!
//! ```bash
//! cargo test -p nlroute --features testing --test engine
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use nlroute::netlink::attr::AttrIter;
use nlroute::netlink::message::{
    NLM_F_ACK, NLM_F_CREATE, NLM_F_MULTI, NLM_F_REPLACE, NLM_F_REQUEST,
};
use nlroute::netlink::route::SourceRoute;
use nlroute::netlink::types::addr::{IfAddrMsg, IfaAttr};
use nlroute::netlink::{
    Connection, ConnectionConfig, Error, MessageKind, NLMSG_HDRLEN, NlMsgHdr, NlMsgType, Outcome,
};
use nlroute::testing::{ScriptedTransport, ack, done, record, route};

fn conn(transport: ScriptedTransport) -> Connection<ScriptedTransport> {
    Connection::from_transport(transport, ConnectionConfig::default())
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn seqs(conn: &Connection<ScriptedTransport>) -> Vec<u32> {
    conn.transport()
        .sent()
        .iter()
        .map(|m| NlMsgHdr::from_bytes(m).unwrap().nlmsg_seq)
        .collect()
}

mod retry {
    use super::*;

    #[tokio::test]
    async fn busy_then_success_reuses_sequence() {
        let conn = conn(
            ScriptedTransport::new()
                .reply(vec![ack(-libc::EBUSY)])
                .reply(vec![ack(-libc::EBUSY)])
                .reply(vec![ack(0)]),
        );
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        conn.request_ack(builder).await.unwrap();

        let seqs = seqs(&conn);
        assert_eq!(seqs.len(), 3);
        assert!(seqs.iter().all(|s| *s == seqs[0]));
    }

    #[tokio::test]
    async fn busy_until_budget_exhausted() {
        let conn = conn(
            ScriptedTransport::new()
                .reply(vec![ack(-libc::EBUSY)])
                .reply(vec![ack(-libc::EBUSY)])
                .reply(vec![ack(-libc::EBUSY)]),
        );
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        let err = conn.request_ack(builder).await.unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { attempts: 3 }));
        assert!(err.is_timeout());
        assert_eq!(conn.transport().sent().len(), 3);
    }

    #[tokio::test]
    async fn budget_is_configurable() {
        let transport = ScriptedTransport::new()
            .reply(vec![ack(-libc::EBUSY)])
            .reply(vec![ack(0)]);
        let conn = Connection::from_transport(transport, ConnectionConfig::new().retries(1));
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        let err = conn.request_ack(builder).await.unwrap_err();
        assert!(matches!(err, Error::RetryExhausted { attempts: 1 }));
    }

    #[tokio::test]
    async fn send_failure_is_transmit_failure() {
        let conn = conn(ScriptedTransport::new().send_failure(io::ErrorKind::PermissionDenied));
        let builder = conn.ack_request(NlMsgType::RTM_NEWRULE, 0);
        let err = conn.request_ack(builder).await.unwrap_err();
        assert!(matches!(err, Error::TransmitFailure(_)));
    }
}

mod reassembly {
    use super::*;

    #[tokio::test]
    async fn fragments_until_done() {
        let fragments = vec![
            record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[1; 16]),
            record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[2; 20]),
            record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[3; 5]),
            done(),
        ];
        let expected: usize = fragments.iter().map(|r| r.encode(1).len()).sum();

        let mut transport = ScriptedTransport::new();
        for fragment in fragments {
            transport = transport.reply(vec![fragment]);
        }
        let conn = conn(transport);

        let builder = conn.dump_request(NlMsgType::RTM_GETLINK);
        let response = conn.request(builder).await.unwrap();
        assert_eq!(response.len(), expected);
        assert_eq!(response.records().count(), 4);
        assert_eq!(response.dump_payloads(MessageKind::NewLink).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn non_multi_record_terminates() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            record(NlMsgType::RTM_NEWROUTE, NLM_F_MULTI, &[0; 12]),
            record(NlMsgType::RTM_NEWROUTE, 0, &[0; 12]),
        ]));
        let builder = conn.dump_request(NlMsgType::RTM_GETROUTE);
        let response = conn.request(builder).await.unwrap();
        assert_eq!(response.records().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_terminator_times_out() {
        let conn = conn(
            ScriptedTransport::new()
                .reply(vec![record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[0; 16])])
                .reply(vec![record(NlMsgType::RTM_NEWLINK, NLM_F_MULTI, &[0; 16])]),
        );
        let builder = conn.dump_request(NlMsgType::RTM_GETLINK);
        let err = conn.request(builder).await.unwrap_err();
        match err {
            Error::Timeout(t) => assert_eq!(t, Duration::from_millis(1000)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_datagram_fails_the_exchange() {
        let conn = conn(
            ScriptedTransport::new()
                .overflow(2952, 64)
                .reply(vec![ack(0)]),
        );
        let builder = conn.dump_request(NlMsgType::RTM_GETLINK);
        let err = conn.request(builder).await.unwrap_err();

        assert!(matches!(
            err,
            Error::BufferOverflow {
                received: 2952,
                capacity: 64
            }
        ));
        assert_eq!(Outcome::of::<()>(&Err(err)).classification, "buffer overflow");
        assert_eq!(conn.transport().sent().len(), 1);
        assert_eq!(conn.transport().pending_replies(), 1);
    }

    #[tokio::test]
    async fn foreign_sender_is_ignored() {
        let conn = conn(
            ScriptedTransport::new()
                .reply_from(31337, vec![ack(-libc::EPERM)])
                .reply(vec![ack(0)]),
        );
        let builder = conn.ack_request(NlMsgType::RTM_NEWADDR, 0);
        conn.request_ack(builder).await.unwrap();
    }

    #[tokio::test]
    async fn interleaved_stale_records() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            ack(-libc::EEXIST).with_seq(500),
            ack(0),
        ]));
        let builder = conn.ack_request(NlMsgType::RTM_NEWADDR, 0);
        conn.request_ack(builder).await.unwrap();
    }
}

mod classification {
    use super::*;

    async fn outcome_of(code: i32) -> (Result<(), Error>, Outcome) {
        let conn = conn(ScriptedTransport::new().reply(vec![ack(code)]));
        let builder = conn.ack_request(NlMsgType::RTM_NEWROUTE, 0);
        let result = conn.request_ack(builder).await;
        let outcome = Outcome::of(&result);
        (result, outcome)
    }

    #[tokio::test]
    async fn kernel_error_codes() {
        let (result, outcome) = outcome_of(-libc::EEXIST).await;
        assert!(matches!(result, Err(Error::AlreadyExists)));
        assert_eq!(outcome.classification, "already exists");

        let (result, _) = outcome_of(-libc::ESRCH).await;
        assert!(matches!(result, Err(Error::NotFound { errno: 3 })));

        let (result, outcome) = outcome_of(-libc::ENOENT).await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(outcome.exit_code(), 1);

        let (result, outcome) = outcome_of(-libc::EINVAL).await;
        assert!(matches!(
            result,
            Err(Error::ProtocolError { errno, .. }) if errno == libc::EINVAL
        ));
        assert_eq!(outcome.classification, format!("protocol error({})", libc::EINVAL));

        let (result, outcome) = outcome_of(0).await;
        assert!(result.is_ok());
        assert!(outcome.success);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn unexpected_leading_record() {
        let conn = conn(ScriptedTransport::new().reply(vec![
            record(NlMsgType::RTM_NEWADDR, NLM_F_MULTI, &[0; 8]),
            done(),
        ]));
        let err = conn.get_links().await.unwrap_err();
        assert!(matches!(err, Error::NotAcknowledged));
    }
}

mod operations {
    use super::*;

    #[tokio::test]
    async fn add_address_to_named_interface() {
        let conn = conn(ScriptedTransport::new().reply(vec![ack(0)]));
        conn.add_address("lo", IpAddr::V4(Ipv4Addr::new(5, 0, 2, 4)), 32)
            .await
            .unwrap();

        let sent = conn.transport().sent();
        assert_eq!(sent.len(), 1);
        let header = NlMsgHdr::from_bytes(&sent[0]).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWADDR);
        assert_eq!(
            header.nlmsg_flags,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE
        );
        assert_eq!(header.nlmsg_len as usize, sent[0].len());

        let ifa = IfAddrMsg::from_bytes(&sent[0][NLMSG_HDRLEN..]).unwrap();
        assert_eq!(ifa.ifa_family, libc::AF_INET as u8);
        assert_eq!(ifa.ifa_prefixlen, 32);
        assert_eq!(ifa.ifa_index, nlroute::util::name_to_index("lo").unwrap());

        let attrs: Vec<_> = AttrIter::new(&sent[0][NLMSG_HDRLEN + IfAddrMsg::SIZE..]).collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, IfaAttr::Local as u16);
        assert_eq!(attrs[0].1, &[5, 0, 2, 4]);
    }

    #[tokio::test]
    async fn default_source_route_is_rejected() {
        let conn = conn(ScriptedTransport::new().reply(vec![ack(0)]));
        let routes = [
            SourceRoute::new(ip("0.0.0.0"), 0, ip("10.0.0.1")),
            SourceRoute::new(ip("0.0.0.0"), 0, ip("10.0.0.1"))
                .gateway(ip("10.0.0.254"))
                .mtu(1500),
        ];
        for route in &routes {
            let err = conn.add_source_route(route).await.unwrap_err();
            assert!(matches!(err, Error::NotSupported(_)));
        }
        assert!(conn.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn route_selection_by_candidate_source() {
        let conn = conn(
            ScriptedTransport::new()
                .reply(vec![
                    route(ip("10.0.0.1"), 32, Some(ip("10.0.0.1")), None),
                    route(ip("10.0.0.0"), 24, None, None),
                    done(),
                ])
                .reply(vec![route(ip("10.0.0.0"), 24, None, None), done()]),
        );

        let best = conn
            .get_route(ip("10.0.0.1"), None, Some(ip("10.0.0.1")))
            .await
            .unwrap();
        assert_eq!(best.prefix_len, 32);
        assert_eq!(best.prefsrc, Some(ip("10.0.0.1")));

        let best = conn.get_route(ip("10.0.0.1"), None, None).await.unwrap();
        assert_eq!(best.prefix_len, 24);
        assert_eq!(best.prefsrc, None);
    }
}
