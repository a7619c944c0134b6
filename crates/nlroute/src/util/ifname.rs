//! Interface name and index utilities.

use std::ffi::{CStr, CString};

/// Maximum interface name length (including null terminator).
pub const IFNAMSIZ: usize = libc::IF_NAMESIZE;

/// Error type for interface operations.
#[derive(Debug, thiserror::Error)]
pub enum IfError {
    #[error("interface not found: {0}")]
    NotFound(String),

    #[error("invalid interface name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, IfError>;

/// Validate an interface name.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(IfError::InvalidName("empty name".to_string()));
    }

    if name.len() >= IFNAMSIZ {
        return Err(IfError::InvalidName(format!(
            "name too long (max {} chars)",
            IFNAMSIZ - 1
        )));
    }

    if name.contains('/') || name.contains('\0') {
        return Err(IfError::InvalidName(
            "name contains invalid characters".to_string(),
        ));
    }

    if name.chars().any(|c| c.is_whitespace()) {
        return Err(IfError::InvalidName("name contains whitespace".to_string()));
    }

    Ok(())
}

/// Convert an interface name to index (`if_nametoindex(3)`).
pub fn name_to_index(name: &str) -> Result<u32> {
    validate(name)?;

    let c_name = CString::new(name).map_err(|_| IfError::InvalidName(name.to_string()))?;
    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(IfError::NotFound(name.to_string()));
    }
    Ok(index)
}

/// Convert an interface index to name (`if_indextoname(3)`).
pub fn index_to_name(index: u32) -> Result<String> {
    if index == 0 {
        return Err(IfError::NotFound("index 0".to_string()));
    }

    let mut buf = [0 as libc::c_char; IFNAMSIZ];
    // SAFETY: buf holds IF_NAMESIZE bytes as if_indextoname requires.
    let ret = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if ret.is_null() {
        return Err(IfError::NotFound(format!("index {}", index)));
    }
    // SAFETY: on success the kernel wrote a NUL-terminated name into buf.
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate("eth0").is_ok());
        assert!(validate("lo").is_ok());
        assert!(validate("veth123").is_ok());

        assert!(validate("").is_err());
        assert!(validate("this_name_is_way_too_long_for_an_interface").is_err());
        assert!(validate("eth/0").is_err());
        assert!(validate("eth 0").is_err());
    }

    #[test]
    fn test_loopback_round_trip() {
        let index = name_to_index("lo").unwrap();
        assert!(index > 0);
        assert_eq!(index_to_name(index).unwrap(), "lo");
    }

    #[test]
    fn test_missing_interface() {
        assert!(matches!(
            name_to_index("nlroute-none0"),
            Err(IfError::NotFound(_))
        ));
        assert!(index_to_name(0).is_err());
    }
}
