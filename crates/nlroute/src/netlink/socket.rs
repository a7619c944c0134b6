//! Low-level async netlink socket operations.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::config::DEFAULT_RECV_BUFFER;
use super::error::{Error, Result};
use super::transport::{Datagram, Transport};

/// Async NETLINK_ROUTE socket.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Local port ID (assigned by kernel).
    pid: u32,
    /// Receive buffer size.
    recv_buffer: usize,
}

impl NetlinkSocket {
    /// Create and bind a new routing socket.
    pub fn new() -> Result<Self> {
        Self::with_recv_buffer(DEFAULT_RECV_BUFFER)
    }

    /// Create a socket that receives into buffers of `recv_buffer` bytes.
    pub fn with_recv_buffer(recv_buffer: usize) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_ROUTE)?;
        socket.set_non_blocking(true)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK is optional; older kernels reject it.
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket)?;

        Ok(Self {
            fd,
            pid,
            recv_buffer,
        })
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Subscribe to a multicast group.
    pub fn add_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().add_membership(group)?;
        Ok(())
    }

    /// Unsubscribe from a multicast group.
    pub fn drop_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().drop_membership(group)?;
        Ok(())
    }

    /// Send a message.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self
                .fd
                .ready(Interest::WRITABLE)
                .await
                .map_err(Error::TransmitFailure)?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(Ok(sent)) if sent == msg.len() => return Ok(()),
                Ok(Ok(sent)) => {
                    return Err(Error::TransmitFailure(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", sent, msg.len()),
                    )));
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(Error::TransmitFailure(e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram together with the sender's port id.
    ///
    /// The receive uses `MSG_TRUNC`, so the kernel reports the real datagram
    /// size even when it did not fit.
    pub async fn recv_from(&self) -> Result<Datagram> {
        let mut buf = BytesMut::with_capacity(self.recv_buffer);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| inner.get_ref().recv_from(&mut buf, libc::MSG_TRUNC)) {
                Ok(Ok((received, addr))) => {
                    if received > self.recv_buffer {
                        return Err(Error::BufferOverflow {
                            received,
                            capacity: self.recv_buffer,
                        });
                    }
                    return Ok(Datagram {
                        data: buf.to_vec(),
                        sender: addr.port_number(),
                    });
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            }
        }
    }
}

impl Transport for NetlinkSocket {
    fn port_id(&self) -> u32 {
        self.pid
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        NetlinkSocket::send(self, msg).await
    }

    async fn recv(&self) -> Result<Datagram> {
        self.recv_from().await
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

/// Multicast groups for NETLINK_ROUTE.
pub mod rtnetlink_groups {
    pub const RTNLGRP_LINK: u32 = 1;
    pub const RTNLGRP_IPV4_IFADDR: u32 = 5;
    pub const RTNLGRP_IPV4_ROUTE: u32 = 7;
    pub const RTNLGRP_IPV6_IFADDR: u32 = 9;
    pub const RTNLGRP_IPV6_ROUTE: u32 = 11;
}
