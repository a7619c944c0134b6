//! Common utilities for kernel integration tests.
//!
//! Each test moves its own thread into a fresh network namespace, so the
//! host's addresses, routes and rules are never touched. Tests use the
//! default current-thread runtime, which keeps every socket on that thread.

use std::io;
use std::process::Command;

use nlroute::{Error, Result};

/// Move the calling thread into a new, empty network namespace.
///
/// Only loopback exists afterwards, and it is down.
pub fn enter_private_netns() -> Result<()> {
    if unsafe { libc::unshare(libc::CLONE_NEWNET) } != 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}

/// Bring an interface up using the ip command.
///
/// The child inherits the calling thread's namespace.
pub fn link_up(name: &str) -> Result<()> {
    let status = Command::new("ip")
        .args(["link", "set", name, "up"])
        .status()?;
    if !status.success() {
        return Err(Error::InvalidMessage(format!("failed to bring {} up", name)));
    }
    Ok(())
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}
