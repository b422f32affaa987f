// src/allocator/subnet_allocator.rs
//! Concurrency-safe subnet allocation.
//!
//! The backend has no "reserve exactly this range" primitive, so the
//! allocator claims free candidates one by one with create-if-absent
//! requests and moves on when another claimant got there first. The
//! backend rejecting a second claim of the same range is the only
//! synchronization; there are no client-side locks.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::allocator::candidates::{self, CandidateRange};
use crate::backend::{AddressBlock, ClaimOutcome, IpamBackend, SubnetClaim};
use crate::config::constants::GATEWAY_CLASS_PARAMETER;
use crate::network::{address, gateway_address};
use crate::resources::class_params::ClassParameters;
use crate::types::{IpamError, Result};
use crate::utils;

/// What to allocate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    pub block: AddressBlock,
    pub name: String,
    pub prefix_length: u8,
    pub terminal: bool,
    pub class: String,
    pub class_parameters: ClassParameters,
    /// Signed gateway offset, 0 for no gateway
    pub gateway_offset: i64,
}

/// A successfully claimed subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub subnet_id: String,
    pub address: Ipv4Addr,
    pub prefix_length: u8,
    pub gateway: Option<Ipv4Addr>,
    /// Claim requests sent, including the successful one
    pub attempts: usize,
}

enum ClaimState {
    Start,
    TryCandidate(usize),
    Claimed(Allocation),
    Exhausted,
}

/// Finds and claims free subnets inside a block
#[derive(Clone)]
pub struct SubnetAllocator {
    backend: Arc<dyn IpamBackend>,
    max_find: u32,
    claim_jitter: Duration,
}

impl SubnetAllocator {
    pub fn new(backend: Arc<dyn IpamBackend>, max_find: u32, claim_jitter: Duration) -> Self {
        Self { backend, max_find, claim_jitter }
    }

    /// Claim the first free candidate of the requested size.
    ///
    /// Conflicts advance to the next candidate; any other error aborts
    /// without trying further candidates.
    pub async fn allocate(&self, request: &SubnetRequest) -> Result<Allocation> {
        validate(request)?;

        let mut candidates: Vec<CandidateRange> = Vec::new();
        let mut attempts = 0;
        let mut state = ClaimState::Start;

        loop {
            state = match state {
                ClaimState::Start => {
                    let found = self.backend
                        .find_free_subnets(&request.block, request.prefix_length, self.max_find)
                        .await?;
                    candidates = candidates::to_candidates(found, request.prefix_length);
                    debug!(
                        "Found {} free /{} candidates in block {}",
                        candidates.len(), request.prefix_length, request.block.name
                    );
                    ClaimState::TryCandidate(0)
                }

                ClaimState::TryCandidate(i) => match candidates.get(i) {
                    None => ClaimState::Exhausted,
                    Some(candidate) => {
                        let candidate = *candidate;
                        tokio::time::sleep(utils::random_jitter(self.claim_jitter)).await;

                        let gateway = gateway_address(candidate.address, candidate.prefix_length, request.gateway_offset)?;
                        let claim = build_claim(request, candidate, gateway);
                        attempts += 1;

                        match self.backend.claim_subnet(&claim).await? {
                            ClaimOutcome::Claimed { id } => ClaimState::Claimed(Allocation {
                                subnet_id: id,
                                address: candidate.address,
                                prefix_length: candidate.prefix_length,
                                gateway,
                                attempts,
                            }),
                            ClaimOutcome::Conflict { reason } => {
                                debug!(
                                    "Claim of {}/{} rejected ({}), trying another one",
                                    candidate.address, candidate.prefix_length, reason
                                );
                                ClaimState::TryCandidate(i + 1)
                            }
                        }
                    }
                },

                ClaimState::Claimed(allocation) => {
                    info!(
                        "Claimed IP subnet {}/{} (oid {}) after {} attempt(s)",
                        allocation.address, allocation.prefix_length, allocation.subnet_id, allocation.attempts
                    );
                    return Ok(allocation);
                }

                ClaimState::Exhausted => {
                    warn!(
                        "No free /{} subnet could be claimed in block {} ({} candidate(s) tried)",
                        request.prefix_length, request.block.name, attempts
                    );
                    return Err(IpamError::AllocationExhausted {
                        block: request.block.name.clone(),
                        prefix_length: request.prefix_length,
                    });
                }
            };
        }
    }
}

fn validate(request: &SubnetRequest) -> Result<()> {
    if request.prefix_length == 0 || request.prefix_length > address::MAX_PREFIX_LENGTH {
        return Err(IpamError::MalformedAddress(format!(
            "requested prefix length /{} is outside 1..=32", request.prefix_length
        )));
    }
    // Reject an offset that cannot fit before any candidate is fetched
    gateway_address(Ipv4Addr::UNSPECIFIED, request.prefix_length, request.gateway_offset)?;
    Ok(())
}

fn build_claim(request: &SubnetRequest, candidate: CandidateRange, gateway: Option<Ipv4Addr>) -> SubnetClaim {
    let class_parameters = match gateway {
        Some(gateway) => request.class_parameters.with(GATEWAY_CLASS_PARAMETER, gateway.to_string()),
        None => request.class_parameters.clone(),
    };

    SubnetClaim {
        space_id: request.block.space_id.clone(),
        block_id: request.block.id.clone(),
        name: request.name.clone(),
        address: candidate.address,
        prefix_length: candidate.prefix_length,
        terminal: request.terminal,
        class: request.class.clone(),
        class_parameters,
    }
}
