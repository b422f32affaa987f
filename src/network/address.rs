// src/network/address.rs
//! IPv4 address arithmetic.
//!
//! Conversions between dotted-decimal, packed integer and the 8-digit
//! hexadecimal form used on the SOLIDserver wire, plus prefix-size and
//! range-offset helpers.

use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::types::{IpamError, Result};

/// Longest IPv4 prefix length
pub const MAX_PREFIX_LENGTH: u8 = 32;

/// Render a packed address in dotted-decimal form
pub fn packed_to_text(packed: u32) -> String {
    Ipv4Addr::from(packed).to_string()
}

/// Parse a dotted-decimal address into its packed form
pub fn text_to_packed(text: &str) -> Result<u32> {
    Ipv4Addr::from_str(text.trim())
        .map(u32::from)
        .map_err(|e| IpamError::MalformedAddress(format!("{}: {}", text, e)))
}

/// Encode a dotted-decimal address as 8 lower-case hex digits
pub fn text_to_hex(text: &str) -> Result<String> {
    let packed = text_to_packed(text)?;
    Ok(hex::encode(packed.to_be_bytes()))
}

/// Decode the backend's hexadecimal address form into a packed address
pub fn hex_to_packed(hex_addr: &str) -> Result<u32> {
    let mut octets = [0u8; 4];
    hex::decode_to_slice(hex_addr.trim(), &mut octets)
        .map_err(|e| IpamError::MalformedAddress(format!("{}: {}", hex_addr, e)))?;
    Ok(u32::from_be_bytes(octets))
}

/// Decode the backend's hexadecimal address form into dotted-decimal
pub fn hex_to_text(hex_addr: &str) -> Result<String> {
    hex_to_packed(hex_addr).map(packed_to_text)
}

/// Number of addresses covered by a prefix length (2^(32 - prefix_length))
pub fn prefix_size(prefix_length: u8) -> Result<u64> {
    if prefix_length > MAX_PREFIX_LENGTH {
        return Err(IpamError::MalformedAddress(format!(
            "prefix length /{} is outside 0..=32", prefix_length
        )));
    }
    Ok(1u64 << (MAX_PREFIX_LENGTH - prefix_length))
}

/// Address `offset` positions after the start of a range
pub fn offset_from_start(base: u32, size: u64, offset: u64) -> Result<u32> {
    if offset >= size {
        return Err(IpamError::MalformedAddress(format!(
            "offset {} falls outside a range of {} addresses starting at {}",
            offset, size, packed_to_text(base)
        )));
    }
    to_address(u64::from(base) + offset)
}

/// Address `offset` positions before the last address of a range
pub fn offset_from_end(base: u32, size: u64, offset: u64) -> Result<u32> {
    if offset >= size {
        return Err(IpamError::MalformedAddress(format!(
            "offset -{} falls outside a range of {} addresses starting at {}",
            offset, size, packed_to_text(base)
        )));
    }
    to_address(u64::from(base) + size - offset - 1)
}

fn to_address(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        IpamError::MalformedAddress(format!("address value {} exceeds the IPv4 range", value))
    })
}
