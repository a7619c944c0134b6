//! Local address management.
//!
//! Adding is an upsert: the request carries `NLM_F_CREATE | NLM_F_REPLACE`,
//! so re-adding an address that is already configured succeeds. Nothing is
//! reference counted on this side; every add and delete goes to the kernel.
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::Connection;
//!
//! let conn = Connection::new()?;
//! conn.add_address("lo", "5.0.2.4".parse()?, 32).await?;
//! conn.del_address("lo", "5.0.2.4".parse()?, 32).await?;
//! ```

use std::net::IpAddr;

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::error::Result;
use super::interface_ref::InterfaceRef;
use super::message::{NLM_F_CREATE, NLM_F_REPLACE, NlMsgType};
use super::messages::{family_of, octets};
use super::transport::Transport;
use super::types::addr::{IfAddrMsg, IfaAttr};
use super::types::route::RouteScope;

/// Write the ifaddrmsg header and the IFA_LOCAL attribute for `addr/prefix_len`
/// on interface `ifindex`.
pub fn write_address(
    builder: &mut MessageBuilder,
    ifindex: u32,
    addr: IpAddr,
    prefix_len: u8,
) -> Result<()> {
    let msg = IfAddrMsg::new()
        .with_family(family_of(&addr))
        .with_prefixlen(prefix_len)
        .with_scope(RouteScope::Universe as u8)
        .with_index(ifindex);
    builder.append(&msg)?;
    builder.append_attr(IfaAttr::Local as u16, &octets(&addr))
}

impl<T: Transport> Connection<T> {
    /// Build the request that adds `addr/prefix_len` to an interface.
    pub fn add_address_request(
        &self,
        ifindex: u32,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<MessageBuilder> {
        let mut builder =
            self.ack_request(NlMsgType::RTM_NEWADDR, NLM_F_CREATE | NLM_F_REPLACE);
        write_address(&mut builder, ifindex, addr, prefix_len)?;
        Ok(builder)
    }

    /// Build the request that removes `addr/prefix_len` from an interface.
    pub fn del_address_request(
        &self,
        ifindex: u32,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<MessageBuilder> {
        let mut builder = self.ack_request(NlMsgType::RTM_DELADDR, 0);
        write_address(&mut builder, ifindex, addr, prefix_len)?;
        Ok(builder)
    }

    /// Add an address to an interface.
    ///
    /// The interface name is resolved to an index before anything is sent;
    /// an unknown name fails with [`Error::InterfaceNotFound`].
    ///
    /// [`Error::InterfaceNotFound`]: super::Error::InterfaceNotFound
    pub async fn add_address(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<()> {
        let ifindex = iface.into().resolve()?;
        let builder = self.add_address_request(ifindex, addr, prefix_len)?;
        self.request_ack(builder).await
    }

    /// Remove an address from an interface.
    ///
    /// Removing an address that is not configured yields
    /// [`Error::NotFound`] or a protocol error, depending on the kernel.
    ///
    /// [`Error::NotFound`]: super::Error::NotFound
    pub async fn del_address(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<()> {
        let ifindex = iface.into().resolve()?;
        let builder = self.del_address_request(ifindex, addr, prefix_len)?;
        self.request_ack(builder).await
    }
}
