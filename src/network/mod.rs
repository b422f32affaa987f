// src/network/mod.rs
//! Network module for address arithmetic and gateway derivation.

pub mod address;
pub mod gateway;

// Re-export commonly used items
pub use address::{hex_to_text, packed_to_text, prefix_size, text_to_hex, text_to_packed};
pub use gateway::gateway_address;

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use crate::types::{IpamError, Result};

/// Render `address/prefix_length` in CIDR notation
pub fn cidr(address: Ipv4Addr, prefix_length: u8) -> Result<String> {
    Ipv4Network::new(address, prefix_length)
        .map(|network| network.to_string())
        .map_err(|e| IpamError::MalformedAddress(format!("{}/{}: {}", address, prefix_length, e)))
}
