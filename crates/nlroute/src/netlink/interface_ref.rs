//! Interface reference type.
//!
//! Operations that target an interface accept anything convertible into
//! [`InterfaceRef`]: a name, resolved with `if_nametoindex(3)` right before
//! the request is built, or an index that is used as is.
//!
//! ```ignore
//! use nlroute::netlink::InterfaceRef;
//!
//! conn.add_address("eth0", "5.0.2.4".parse()?, 32).await?;
//! conn.add_address(InterfaceRef::index(2), "5.0.2.5".parse()?, 32).await?;
//! ```

use std::fmt;

use super::error::{Error, Result};
use crate::util::ifname::{self, IfError};

/// A reference to a network interface, either by name or by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceRef {
    /// Interface specified by name (resolved when used).
    Name(String),
    /// Interface specified by index (already resolved).
    Index(u32),
}

impl InterfaceRef {
    /// Create an interface reference from a name.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an interface reference from an index.
    #[inline]
    pub fn index(index: u32) -> Self {
        Self::Index(index)
    }

    /// Get the name if this is a name reference.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    /// Get the index if this is an index reference.
    #[inline]
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Name(_) => None,
            Self::Index(idx) => Some(*idx),
        }
    }

    /// Resolve to an interface index.
    pub fn resolve(&self) -> Result<u32> {
        match self {
            Self::Index(idx) => Ok(*idx),
            Self::Name(name) => ifname::name_to_index(name).map_err(|e| match e {
                IfError::NotFound(_) => Error::InterfaceNotFound { name: name.clone() },
                IfError::InvalidName(msg) => Error::InvalidMessage(msg),
            }),
        }
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "ifindex:{}", idx),
        }
    }
}

impl From<&str> for InterfaceRef {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InterfaceRef {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for InterfaceRef {
    #[inline]
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<u32> for InterfaceRef {
    #[inline]
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}
