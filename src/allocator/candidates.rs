// src/allocator/candidates.rs
//! Free-range candidate discovery.
//!
//! Candidates are a snapshot, never a reservation: another claimant may
//! take any of them between the query and our claim.

use std::net::Ipv4Addr;

use crate::backend::AddressBlock;
use crate::client::response::required_field;
use crate::client::{params, Params, Record};
use crate::network::address;
use crate::types::Result;

/// A free base address of the requested size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateRange {
    pub address: Ipv4Addr,
    pub prefix_length: u8,
}

/// `ip_find_free_subnet` parameters
pub fn free_subnet_query(block: &AddressBlock, prefix_length: u8, max_find: u32) -> Params {
    params([
        ("site_id", block.space_id.clone()),
        ("block_id", block.id.clone()),
        ("prefix", prefix_length.to_string()),
        ("max_find", max_find.to_string()),
    ])
}

/// Base addresses of a free-subnet reply, in reply order
pub fn parse_free_subnets(records: &[Record]) -> Result<Vec<Ipv4Addr>> {
    records
        .iter()
        .map(|record| -> Result<Ipv4Addr> {
            let packed = address::hex_to_packed(&required_field(record, "start_ip_addr")?)?;
            Ok(Ipv4Addr::from(packed))
        })
        .collect()
}

/// Pair fetched base addresses with the requested prefix length, ascending
pub fn to_candidates(addresses: Vec<Ipv4Addr>, prefix_length: u8) -> Vec<CandidateRange> {
    let mut candidates: Vec<CandidateRange> = addresses
        .into_iter()
        .map(|address| CandidateRange { address, prefix_length })
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates
}
