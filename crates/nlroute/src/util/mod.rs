//! Shared utilities for nlroute.

pub mod addr;
pub mod ifname;

pub use addr::{parse_addr, parse_prefix, prefix_contains};
pub use ifname::{index_to_name, name_to_index};
