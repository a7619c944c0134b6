//! Parser support for typed rtnetlink records.
//!
//! Records are parsed with winnow: the fixed family header is taken with
//! [`parse_header`] and the trailing attributes are walked with
//! [`AttrIter`](super::attr::AttrIter).

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use super::builder::MessageBuilder;
use super::error::{Error, Result};

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Trait for records that can be parsed from a netlink payload.
pub trait FromNetlink: Sized {
    /// Parse from a mutable byte slice reference.
    /// The slice is advanced past the consumed bytes.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete payload.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse
            .parse(data)
            .map_err(|e| Error::Parse(format!("{}", e)))
    }

    /// Write the family header a dump request for this record needs.
    fn write_dump_header(_builder: &mut MessageBuilder) -> Result<()> {
        Ok(())
    }
}

/// Take a fixed-size family header off the front of `input`.
pub fn parse_header<T>(input: &mut &[u8]) -> PResult<T>
where
    T: FromBytes + KnownLayout + Immutable + Copy,
{
    let taken: PResult<&[u8]> = take(std::mem::size_of::<T>()).parse_next(input);
    let bytes = taken?;
    T::read_from_bytes(bytes).map_err(|_| ErrMode::Cut(ContextError::new()))
}
