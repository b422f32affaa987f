// src/allocator/mod.rs
//! Subnet allocation: free-range discovery and the claim-and-retry loop.

pub mod candidates;
pub mod subnet_allocator;

pub use candidates::CandidateRange;
pub use subnet_allocator::{Allocation, SubnetAllocator, SubnetRequest};
