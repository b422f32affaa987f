// src/types.rs
//! Shared error and result types.

use std::fmt;

/// Kind of backend object a lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Space,
    Block,
    Subnet,
    Address,
    Application,
    Group,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Space => "space",
            ObjectKind::Block => "block",
            ObjectKind::Subnet => "IP subnet",
            ObjectKind::Address => "IP address",
            ObjectKind::Application => "application",
            ObjectKind::Group => "user group",
        };
        f.write_str(name)
    }
}

/// Error types for IPAM operations
#[derive(thiserror::Error, Debug)]
pub enum IpamError {
    #[error("Unable to find {kind}: {name}")]
    NotFound { kind: ObjectKind, name: String },

    #[error("Claim rejected, {what} is already taken")]
    Conflict { what: String },

    #[error("No free /{prefix_length} subnet could be claimed in block {block}")]
    AllocationExhausted { block: String, prefix_length: u8 },

    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IpamError {
    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        IpamError::NotFound { kind, name: name.into() }
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        IpamError::Backend { status, message: message.into() }
    }

    /// Transport failures and non-conflict domain errors
    pub fn is_backend_error(&self) -> bool {
        matches!(self, IpamError::Backend { .. } | IpamError::Transport(_))
    }
}

/// Result type for IPAM operations
pub type Result<T> = std::result::Result<T, IpamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identifiers() {
        let err = IpamError::not_found(ObjectKind::Block, "PROD-BLOCK");
        assert_eq!(err.to_string(), "Unable to find block: PROD-BLOCK");

        let err = IpamError::AllocationExhausted { block: "17".to_string(), prefix_length: 24 };
        assert!(err.to_string().contains("/24"));
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_backend_error_grouping() {
        assert!(IpamError::backend(500, "boom").is_backend_error());
        assert!(!IpamError::MalformedAddress("x".to_string()).is_backend_error());
        assert!(!IpamError::Conflict { what: "10.0.0.0/24".to_string() }.is_backend_error());
    }
}
