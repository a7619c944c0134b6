//! Error types for rtnetlink operations.

use std::io;
use std::time::Duration;

/// Result type for rtnetlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// errno values the engine classifies explicitly.
pub(crate) mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const ESRCH: i32 = 3;
    pub const EACCES: i32 = 13;
    pub const EBUSY: i32 = 16;
    pub const EEXIST: i32 = 17;
}

/// Errors that can occur during rtnetlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket creation or binding.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Sending a request to the kernel failed.
    #[error("netlink write error: {0}")]
    TransmitFailure(#[source] io::Error),

    /// No datagram became ready within the receive timeout.
    #[error("no reply from kernel within {0:?}")]
    Timeout(Duration),

    /// The kernel delivered more bytes than the receive buffer holds.
    #[error("netlink response of {received} bytes exceeds buffer size {capacity}")]
    BufferOverflow {
        /// Bytes the kernel reported for the datagram.
        received: usize,
        /// Size of the receive buffer.
        capacity: usize,
    },

    /// The kernel kept answering EBUSY until the retry budget ran out.
    #[error("netlink request timed out after {attempts} transmissions")]
    RetryExhausted {
        /// Number of transmissions performed.
        attempts: u32,
    },

    /// The kernel reported that the entry already exists (EEXIST).
    #[error("entry already exists")]
    AlreadyExists,

    /// The kernel reported that the entry does not exist (ESRCH/ENOENT).
    #[error("entry not found (errno {errno})")]
    NotFound {
        /// The errno value from the kernel.
        errno: i32,
    },

    /// Any other kernel error code.
    #[error("kernel error: {message} (errno {errno})")]
    ProtocolError {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// The reply did not contain the acknowledgement or records expected.
    #[error("netlink request not acknowledged")]
    NotAcknowledged,

    /// No usable route leads to the destination.
    #[error("{0} is unreachable")]
    Unreachable(String),

    /// An attribute would not fit in the request buffer.
    #[error("buffer too small: need {needed} bytes, capacity {capacity}")]
    BufferTooSmall {
        /// Bytes required by the encoding.
        needed: usize,
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Operation not supported.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// Parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Interface not found.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name that was not found.
        name: String,
    },
}

impl Error {
    /// Create an error from a kernel error code (negative errno).
    ///
    /// EEXIST maps to [`Error::AlreadyExists`], ESRCH and ENOENT to
    /// [`Error::NotFound`]; everything else is a [`Error::ProtocolError`].
    pub fn from_errno(code: i32) -> Self {
        let errno = code.saturating_abs();
        match errno {
            errno::EEXIST => Self::AlreadyExists,
            errno::ESRCH | errno::ENOENT => Self::NotFound { errno },
            _ => Self::ProtocolError {
                errno,
                message: io::Error::from_raw_os_error(errno).to_string(),
            },
        }
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InterfaceNotFound { .. })
    }

    /// Check if this is an "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists)
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.errno(), Some(errno::EPERM | errno::EACCES))
    }

    /// Check if this is a "device busy" error (EBUSY).
    pub fn is_busy(&self) -> bool {
        self.errno() == Some(errno::EBUSY)
    }

    /// Check if the exchange gave up waiting (receive timeout or retry budget).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RetryExhausted { .. })
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::AlreadyExists => Some(errno::EEXIST),
            Self::NotFound { errno } | Self::ProtocolError { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Short classification label for reporting.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Io(_) => "io error",
            Self::TransmitFailure(_) => "transmit failure",
            Self::Timeout(_) => "timeout",
            Self::BufferOverflow { .. } => "buffer overflow",
            Self::RetryExhausted { .. } => "retry exhausted",
            Self::AlreadyExists => "already exists",
            Self::NotFound { .. } => "not found",
            Self::ProtocolError { .. } => "protocol error",
            Self::NotAcknowledged => "not acknowledged",
            Self::Unreachable(_) => "unreachable",
            Self::BufferTooSmall { .. } => "buffer too small",
            Self::Truncated { .. } | Self::InvalidMessage(_) | Self::Parse(_) => "malformed reply",
            Self::NotSupported(_) => "not supported",
            Self::InterfaceNotFound { .. } => "interface not found",
        }
    }
}

/// Boolean-style result of a domain operation, for exit-code reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the operation completed.
    pub success: bool,
    /// Human-readable classification ("ok" on success).
    pub classification: String,
}

impl Outcome {
    /// Build an outcome from an operation result.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                classification: "ok".to_string(),
            },
            Err(e) => Self {
                success: false,
                classification: match e {
                    Error::ProtocolError { errno, .. } => format!("protocol error({})", errno),
                    other => other.classification().to_string(),
                },
            },
        }
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}
