//! Async rtnetlink protocol implementation for Linux.
//!
//! Requests are built into a fixed-capacity [`MessageBuilder`], exchanged by
//! a [`Connection`] (sequence numbers, reassembly of multi-part replies,
//! retry on `EBUSY`, acknowledgement classification) and decoded into
//! typed records from [`messages`].
//!
//! # Quick Start
//!
//! ```ignore
//! use nlroute::netlink::{Connection, route::SourceRoute, rule::RuleBuilder};
//!
//! let conn = Connection::new()?;
//!
//! conn.add_address("lo", "5.0.2.4".parse()?, 32).await?;
//! conn.add_rule(RuleBuilder::v4(100).priority(1000)).await?;
//! conn.add_source_route(
//!     &SourceRoute::new("10.8.0.0".parse()?, 16, "5.0.2.4".parse()?).table(100),
//! ).await?;
//!
//! let src = conn.get_source_addr("10.8.1.1".parse()?, None).await?;
//! ```
//!
//! # Event Monitoring
//!
//! ```ignore
//! use nlroute::netlink::{ListenerConfig, events::EventListener};
//! use tokio_stream::StreamExt;
//!
//! let (handle, mut events) = EventListener::stream(ListenerConfig::new())?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod addr;
pub mod attr;
mod builder;
mod config;
pub mod connection;
mod error;
pub mod events;
mod interface_ref;
pub mod lookup;
pub mod message;
pub mod messages;
pub mod parse;
pub mod route;
pub mod rule;
mod socket;
mod transport;
pub mod types;

pub use attr::{AttrIter, NlAttr};
pub use builder::{DEFAULT_REQUEST_CAPACITY, MessageBuilder, NestToken};
pub use config::{ConnectionConfig, ListenerConfig};
pub use connection::{Connection, Response};
pub use error::{Error, Outcome, Result};
pub use events::{EventHandler, EventListener, ListenerHandle, NetworkEvent};
pub use interface_ref::InterfaceRef;
pub use message::{MessageIter, MessageKind, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use messages::{AddressRecord, LinkRecord, RouteRecord};
pub use parse::FromNetlink;
pub use socket::{NetlinkSocket, rtnetlink_groups};
pub use transport::{Datagram, Transport};
