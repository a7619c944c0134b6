//! Kernel notification listener.
//!
//! The listener owns its own routing socket, joins the multicast groups
//! selected in [`ListenerConfig`] and runs on a background task until it is
//! stopped. Each notification record is decoded into a [`NetworkEvent`] and
//! handed to an [`EventHandler`], or forwarded into a stream.
//!
//! # Handler Example
//!
//! ```ignore
//! use nlroute::netlink::events::{Change, EventHandler, EventListener};
//! use nlroute::netlink::messages::{AddressRecord, LinkRecord};
//! use nlroute::netlink::ListenerConfig;
//!
//! struct Printer;
//!
//! impl EventHandler for Printer {
//!     fn on_link(&mut self, change: Change, link: &LinkRecord) {
//!         println!("{:?} link {}", change, link.name_or("?"));
//!     }
//!     fn on_address(&mut self, change: Change, addr: &AddressRecord) {
//!         println!("{:?} address {:?}", change, addr.primary());
//!     }
//! }
//!
//! let handle = EventListener::spawn(ListenerConfig::new(), Printer)?;
//! // ...
//! handle.stop().await;
//! ```
//!
//! # Stream Example
//!
//! ```ignore
//! use nlroute::netlink::events::EventListener;
//! use nlroute::netlink::ListenerConfig;
//! use tokio_stream::StreamExt;
//!
//! let (handle, mut events) = EventListener::stream(ListenerConfig::new().routes(false))?;
//! while let Some(event) = events.next().await {
//!     println!("{} {:?}", event.action(), event);
//! }
//! handle.stop().await;
//! ```
//!
//! Receive errors never end the loop: interrupted or would-block receives
//! are retried at once, anything else is logged and retried after the
//! configured backoff. Datagrams that were not sent by the kernel are
//! dropped.

use std::io;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::config::ListenerConfig;
use super::error::{Error, Result};
use super::message::{MessageIter, MessageKind};
use super::messages::{AddressRecord, LinkRecord, RouteRecord};
use super::parse::FromNetlink;
use super::socket::NetlinkSocket;
use super::transport::Transport;

/// Network events that can be received from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", content = "record"))]
pub enum NetworkEvent {
    /// A new link was created or an existing link changed.
    NewLink(LinkRecord),
    /// A link was deleted.
    DelLink(LinkRecord),
    /// A new address was added.
    NewAddress(AddressRecord),
    /// An address was removed.
    DelAddress(AddressRecord),
    /// A new route was added.
    NewRoute(RouteRecord),
    /// A route was removed.
    DelRoute(RouteRecord),
}

/// Whether a record was added (or changed) or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Del,
}

impl NetworkEvent {
    /// Decode one notification record. Kinds other than link, address
    /// and route, and records that fail to parse, yield `None`.
    pub fn parse(kind: MessageKind, payload: &[u8]) -> Option<Self> {
        let event = match kind {
            MessageKind::NewLink => LinkRecord::from_bytes(payload).map(Self::NewLink),
            MessageKind::DelLink => LinkRecord::from_bytes(payload).map(Self::DelLink),
            MessageKind::NewAddr => AddressRecord::from_bytes(payload).map(Self::NewAddress),
            MessageKind::DelAddr => AddressRecord::from_bytes(payload).map(Self::DelAddress),
            MessageKind::NewRoute => RouteRecord::from_bytes(payload).map(Self::NewRoute),
            MessageKind::DelRoute => RouteRecord::from_bytes(payload).map(Self::DelRoute),
            _ => return None,
        };
        match event {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(?kind, error = %e, "skipping undecodable notification");
                None
            }
        }
    }

    /// Returns true if this is a "new" event (add or change).
    pub fn is_new(&self) -> bool {
        self.change() == Change::New
    }

    /// Returns true if this is a "delete" event.
    pub fn is_del(&self) -> bool {
        !self.is_new()
    }

    /// Whether the record was added or removed.
    pub fn change(&self) -> Change {
        match self {
            Self::NewLink(_) | Self::NewAddress(_) | Self::NewRoute(_) => Change::New,
            Self::DelLink(_) | Self::DelAddress(_) | Self::DelRoute(_) => Change::Del,
        }
    }

    /// Returns the interface index associated with this event, if any.
    pub fn ifindex(&self) -> Option<u32> {
        match self {
            Self::NewLink(m) | Self::DelLink(m) => Some(m.index),
            Self::NewAddress(m) | Self::DelAddress(m) => Some(m.index),
            Self::NewRoute(m) | Self::DelRoute(m) => m.oif,
        }
    }

    /// Returns "new" or "del" based on the event type.
    pub fn action(&self) -> &'static str {
        if self.is_new() { "new" } else { "del" }
    }
}

/// Receives decoded notifications on the listener task.
///
/// Route changes are ignored unless `on_route` is overridden.
pub trait EventHandler: Send + 'static {
    /// A link appeared, changed or disappeared.
    fn on_link(&mut self, change: Change, link: &LinkRecord);

    /// An address was added or removed.
    fn on_address(&mut self, change: Change, addr: &AddressRecord);

    /// A route was added or removed.
    fn on_route(&mut self, _change: Change, _route: &RouteRecord) {}

    /// Whether the handler wants no more events. The listener stops once
    /// this returns true.
    fn is_closed(&self) -> bool {
        false
    }

    /// Entry point for every event; dispatches to the typed callbacks.
    fn on_event(&mut self, event: NetworkEvent) {
        let change = event.change();
        match &event {
            NetworkEvent::NewLink(link) | NetworkEvent::DelLink(link) => self.on_link(change, link),
            NetworkEvent::NewAddress(addr) | NetworkEvent::DelAddress(addr) => {
                self.on_address(change, addr)
            }
            NetworkEvent::NewRoute(route) | NetworkEvent::DelRoute(route) => {
                self.on_route(change, route)
            }
        }
    }
}

/// Forwards every event into an unbounded channel.
struct ChannelHandler {
    tx: mpsc::UnboundedSender<NetworkEvent>,
}

impl EventHandler for ChannelHandler {
    fn on_link(&mut self, _change: Change, _link: &LinkRecord) {}

    fn on_address(&mut self, _change: Change, _addr: &AddressRecord) {}

    fn on_event(&mut self, event: NetworkEvent) {
        if self.tx.send(event).is_err() {
            debug!("event stream receiver dropped");
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Decode every record in a notification datagram and hand it to `handler`.
///
/// Returns the number of events dispatched.
pub fn dispatch<H: EventHandler + ?Sized>(data: &[u8], handler: &mut H) -> usize {
    let mut count = 0;
    for result in MessageIter::new(data) {
        let (header, payload) = match result {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "dropping rest of malformed notification");
                break;
            }
        };
        if let Some(event) = NetworkEvent::parse(header.kind(), payload) {
            debug!(action = event.action(), ifindex = ?event.ifindex(), "dispatching event");
            handler.on_event(event);
            count += 1;
        }
    }
    count
}

/// Handle to a running listener task.
///
/// Dropping the handle also stops the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Signal the listener to stop and wait for the task to finish.
    pub async fn stop(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "event listener task failed");
        }
    }

    /// Whether the listener task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the notification loop.
pub struct EventListener;

impl EventListener {
    /// Open a routing socket, join the configured groups and start
    /// dispatching to `handler` on a background task.
    ///
    /// Socket creation, bind and group membership failures are returned;
    /// everything after that is handled inside the loop. Must be called
    /// from within a tokio runtime.
    pub fn spawn<H: EventHandler>(config: ListenerConfig, handler: H) -> Result<ListenerHandle> {
        let mut socket = NetlinkSocket::with_recv_buffer(config.recv_buffer)?;
        for group in config.groups() {
            socket.add_membership(group)?;
        }
        Ok(Self::spawn_on(socket, config.backoff, handler))
    }

    /// Like [`spawn`](Self::spawn), but deliver events as a stream.
    pub fn stream(
        config: ListenerConfig,
    ) -> Result<(ListenerHandle, UnboundedReceiverStream<NetworkEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self::spawn(config, ChannelHandler { tx })?;
        Ok((handle, UnboundedReceiverStream::new(rx)))
    }

    /// Run the loop over an already subscribed transport.
    pub fn spawn_on<T, H>(transport: T, backoff: Duration, handler: H) -> ListenerHandle
    where
        T: Transport + 'static,
        H: EventHandler,
    {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(run(transport, backoff, handler, stopped));
        ListenerHandle { stop, task }
    }

    /// Stream variant of [`spawn_on`](Self::spawn_on).
    pub fn stream_on<T>(
        transport: T,
        backoff: Duration,
    ) -> (ListenerHandle, UnboundedReceiverStream<NetworkEvent>)
    where
        T: Transport + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self::spawn_on(transport, backoff, ChannelHandler { tx });
        (handle, UnboundedReceiverStream::new(rx))
    }
}

async fn run<T, H>(transport: T, backoff: Duration, mut handler: H, mut stop: watch::Receiver<bool>)
where
    T: Transport,
    H: EventHandler,
{
    debug!("event listener started");
    loop {
        let received = tokio::select! {
            _ = stop.changed() => break,
            received = transport.recv() => received,
        };

        match received {
            Ok(datagram) if datagram.sender != 0 => {
                warn!(sender = datagram.sender, "discarding notification not sent by kernel");
            }
            Ok(datagram) => {
                dispatch(&datagram.data, &mut handler);
                if handler.is_closed() {
                    debug!("event consumer gone");
                    break;
                }
            }
            Err(Error::Io(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                continue;
            }
            Err(e) => {
                warn!(error = %e, ?backoff, "event receive failed");
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }
    debug!("event listener stopped");
}
