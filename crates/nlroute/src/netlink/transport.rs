//! The seam between the request engine and the kernel.

use std::future::Future;

use super::error::Result;

/// One datagram as received from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Received bytes.
    pub data: Vec<u8>,
    /// Port id of the sender (0 for the kernel).
    pub sender: u32,
}

impl Datagram {
    /// A datagram sent by the kernel.
    pub fn from_kernel(data: Vec<u8>) -> Self {
        Self { data, sender: 0 }
    }
}

/// Datagram transport used by [`Connection`](super::Connection).
///
/// [`NetlinkSocket`](super::NetlinkSocket) is the production implementation.
/// With the `testing` feature, `nlroute::testing::ScriptedTransport` replays
/// canned replies instead.
pub trait Transport: Send + Sync {
    /// Local port id written into every request header.
    fn port_id(&self) -> u32;

    /// Send one complete request.
    ///
    /// Interrupted sends are retried; any other failure is
    /// [`Error::TransmitFailure`](super::Error::TransmitFailure).
    fn send(&self, msg: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next datagram.
    ///
    /// A datagram larger than the receive buffer is
    /// [`Error::BufferOverflow`](super::Error::BufferOverflow).
    fn recv(&self) -> impl Future<Output = Result<Datagram>> + Send;
}
