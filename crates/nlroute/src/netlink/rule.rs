//! Policy routing rule management.
//!
//! A rule sends traffic to a routing table at a given priority.
//!
//! # Example
//!
//! ```ignore
//! use nlroute::netlink::{Connection, rule::RuleBuilder};
//!
//! let conn = Connection::new()?;
//!
//! // lookup table 100 at priority 1000
//! conn.add_rule(RuleBuilder::v4(100).priority(1000)).await?;
//! conn.del_rule(RuleBuilder::v4(100).priority(1000)).await?;
//! ```

use super::builder::MessageBuilder;
use super::connection::Connection;
use super::error::Result;
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::transport::Transport;
use super::types::route::RouteProtocol;
use super::types::rule::{FibRuleAction, FibRuleHdr, FraAttr};

/// Builder for a table-lookup rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleBuilder {
    family: u8,
    table: u32,
    priority: u32,
}

impl RuleBuilder {
    /// Rule for IPv4 traffic looking up `table`.
    pub fn v4(table: u32) -> Self {
        Self {
            family: libc::AF_INET as u8,
            table,
            priority: 0,
        }
    }

    /// Rule for IPv6 traffic looking up `table`.
    pub fn v6(table: u32) -> Self {
        Self {
            family: libc::AF_INET6 as u8,
            ..Self::v4(table)
        }
    }

    /// Set the rule priority (lower values are evaluated first).
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Routing table selected by the rule.
    pub fn table(&self) -> u32 {
        self.table
    }

    /// Rule priority.
    pub fn get_priority(&self) -> u32 {
        self.priority
    }

    /// Write the rule header and attributes.
    ///
    /// FRA_PRIORITY is always present; FRA_TABLE only when the table id
    /// does not fit the 8-bit header field.
    pub fn write_to(&self, builder: &mut MessageBuilder) -> Result<()> {
        let mut hdr = FibRuleHdr::new().with_family(self.family);
        hdr.table = if self.table > 255 { 0 } else { self.table as u8 };
        hdr.res1 = RouteProtocol::Boot as u8;
        hdr.action = FibRuleAction::ToTbl as u8;
        builder.append(&hdr)?;

        builder.append_attr_u32(FraAttr::Priority as u16, self.priority)?;
        if self.table > 255 {
            builder.append_attr_u32(FraAttr::Table as u16, self.table)?;
        }
        Ok(())
    }
}

impl<T: Transport> Connection<T> {
    /// Build the request for adding a rule (fails if an identical rule exists).
    pub fn add_rule_request(&self, rule: &RuleBuilder) -> Result<MessageBuilder> {
        let mut builder = self.ack_request(NlMsgType::RTM_NEWRULE, NLM_F_CREATE | NLM_F_EXCL);
        rule.write_to(&mut builder)?;
        Ok(builder)
    }

    /// Build the request for deleting a rule.
    pub fn del_rule_request(&self, rule: &RuleBuilder) -> Result<MessageBuilder> {
        let mut builder = self.ack_request(NlMsgType::RTM_DELRULE, 0);
        rule.write_to(&mut builder)?;
        Ok(builder)
    }

    /// Add a policy rule.
    ///
    /// An identical existing rule yields [`Error::AlreadyExists`].
    ///
    /// [`Error::AlreadyExists`]: super::Error::AlreadyExists
    pub async fn add_rule(&self, rule: RuleBuilder) -> Result<()> {
        let builder = self.add_rule_request(&rule)?;
        self.request_ack(builder).await
    }

    /// Delete a policy rule.
    pub async fn del_rule(&self, rule: RuleBuilder) -> Result<()> {
        let builder = self.del_rule_request(&rule)?;
        self.request_ack(builder).await
    }
}
