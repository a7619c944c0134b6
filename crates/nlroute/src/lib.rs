//! Async rtnetlink client for host routing control planes.
//!
//! nlroute talks NETLINK_ROUTE directly: it manages local addresses,
//! source routes and policy rules, answers "which source address and next
//! hop would the kernel use" from route dumps, and listens for link,
//! address and route notifications.
//!
//! # Features
//!
//! - `serde` - `Serialize` for decoded records and events
//! - `testing` - scripted transport for driving the engine without a kernel
//! - `integration` - kernel-touching integration tests (need root)
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::Connection;
//!
//! #[tokio::main]
//! async fn main() -> nlroute::Result<()> {
//!     let conn = Connection::new()?;
//!
//!     conn.for_each_link(|link| {
//!         println!("{}: {}", link.index, link.name_or("?"));
//!     })
//!     .await?;
//!
//!     let src = conn.get_source_addr("1.1.1.1".parse().unwrap(), None).await?;
//!     println!("source for 1.1.1.1: {}", src);
//!     Ok(())
//! }
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
//!     println!("{} {:?}", event.action(), event);
//! }
//! handle.stop().await;
//! ```

pub mod netlink;
pub mod util;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export common types at crate root for convenience
pub use netlink::{Connection, Error, InterfaceRef, Outcome, Result};
