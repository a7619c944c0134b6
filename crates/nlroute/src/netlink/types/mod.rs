//! Fixed-size family headers and attribute identifiers for rtnetlink.

pub mod addr;
pub mod link;
pub mod route;
pub mod rule;
