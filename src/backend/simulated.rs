// src/backend/simulated.rs
//! In-memory [`IpamBackend`] enforcing create-if-absent, for tests that
//! need real contention instead of scripted replies.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;

use super::{AddressBlock, AddressClaim, ClaimOutcome, DeleteOutcome, IpamBackend, SubnetChanges, SubnetClaim, SubnetRecord};
use crate::types::{IpamError, ObjectKind, Result};

struct Block {
    id: String,
    space_id: String,
    name: String,
    network: Ipv4Network,
}

#[derive(Default)]
struct Inventory {
    spaces: HashMap<String, String>,
    blocks: Vec<Block>,
    subnets: HashMap<String, SubnetRecord>,
    addresses: HashMap<(String, Ipv4Addr), String>,
    next_id: u64,
}

impl Inventory {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn space_name(&self, space_id: &str) -> Option<String> {
        self.spaces.iter().find(|(_, id)| id.as_str() == space_id).map(|(name, _)| name.clone())
    }

    fn block_of(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    fn taken(&self, block: &str, candidate: Ipv4Network) -> bool {
        self.subnets.values().filter(|s| s.block == block).any(|s| {
            Ipv4Network::new(s.address, s.prefix_length)
                .map(|n| n.contains(candidate.network()) || candidate.contains(n.network()))
                .unwrap_or(false)
        })
    }
}

/// Simulated appliance holding one inventory behind a lock
#[derive(Default)]
pub struct SimulatedBackend {
    inventory: Mutex<Inventory>,
    subnet_claims: AtomicUsize,
    conflicts: AtomicUsize,
}

impl SimulatedBackend {
    /// Backend with a single space holding a single block
    pub fn with_block(space: &str, block: &str, network: &str) -> Self {
        let backend = Self::default();
        {
            let mut inv = backend.inventory.lock().unwrap();
            let space_id = inv.next_id();
            inv.spaces.insert(space.to_string(), space_id.clone());
            let block_id = inv.next_id();
            inv.blocks.push(Block {
                id: block_id,
                space_id,
                name: block.to_string(),
                network: network.parse().unwrap(),
            });
        }
        backend
    }

    pub fn subnet_claims(&self) -> usize {
        self.subnet_claims.load(Ordering::SeqCst)
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    pub fn subnet_count(&self) -> usize {
        self.inventory.lock().unwrap().subnets.len()
    }

    pub fn address_count(&self) -> usize {
        self.inventory.lock().unwrap().addresses.len()
    }

    /// Take an address out of the pool behind the allocator's back
    pub fn occupy_address(&self, space: &str, address: Ipv4Addr) {
        let mut inv = self.inventory.lock().unwrap();
        let space_id = inv.spaces[space].clone();
        let id = inv.next_id();
        inv.addresses.insert((space_id, address), id);
    }

    fn conflict(&self, reason: String) -> Result<ClaimOutcome> {
        self.conflicts.fetch_add(1, Ordering::SeqCst);
        Ok(ClaimOutcome::Conflict { reason })
    }
}

#[async_trait]
impl IpamBackend for SimulatedBackend {
    async fn find_space(&self, name: &str) -> Result<String> {
        let inv = self.inventory.lock().unwrap();
        inv.spaces.get(name).cloned().ok_or_else(|| IpamError::not_found(ObjectKind::Space, name))
    }

    async fn find_block(&self, space_id: &str, name: &str) -> Result<AddressBlock> {
        let inv = self.inventory.lock().unwrap();
        inv.blocks
            .iter()
            .find(|b| b.space_id == space_id && b.name == name)
            .map(|b| AddressBlock { id: b.id.clone(), space_id: b.space_id.clone(), name: b.name.clone() })
            .ok_or_else(|| IpamError::not_found(ObjectKind::Block, name))
    }

    async fn find_free_subnets(&self, block: &AddressBlock, prefix_length: u8, max_find: u32) -> Result<Vec<Ipv4Addr>> {
        let found = {
            let inv = self.inventory.lock().unwrap();
            let parent = inv.block_of(&block.id).ok_or_else(|| IpamError::not_found(ObjectKind::Block, &block.name))?;
            let step = 1u64 << (32 - u32::from(prefix_length));
            let start = u64::from(u32::from(parent.network.network()));
            let end = start + (1u64 << (32 - u32::from(parent.network.prefix())));

            let mut found = Vec::new();
            let mut base = start;
            while base + step <= end && found.len() < max_find as usize {
                let address = Ipv4Addr::from(base as u32);
                let candidate = Ipv4Network::new(address, prefix_length)
                    .map_err(|e| IpamError::MalformedAddress(e.to_string()))?;
                if !inv.taken(&block.name, candidate) {
                    found.push(address);
                }
                base += step;
            }
            found
        };
        // Let concurrent callers fetch the same snapshot
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn claim_subnet(&self, claim: &SubnetClaim) -> Result<ClaimOutcome> {
        self.subnet_claims.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let mut inv = self.inventory.lock().unwrap();
        let (block, space) = match inv.block_of(&claim.block_id) {
            Some(b) => (b.name.clone(), inv.space_name(&b.space_id).unwrap_or_default()),
            None => return Err(IpamError::not_found(ObjectKind::Block, &claim.block_id)),
        };
        let candidate = Ipv4Network::new(claim.address, claim.prefix_length)
            .map_err(|e| IpamError::MalformedAddress(e.to_string()))?;
        if inv.taken(&block, candidate) {
            drop(inv);
            return self.conflict(format!("{} already exists", candidate));
        }

        let id = inv.next_id();
        inv.subnets.insert(id.clone(), SubnetRecord {
            id: id.clone(),
            space,
            block,
            name: claim.name.clone(),
            address: claim.address,
            prefix_length: claim.prefix_length,
            terminal: claim.terminal,
            class: claim.class.clone(),
            class_parameters: claim.class_parameters.clone(),
        });
        Ok(ClaimOutcome::Claimed { id })
    }

    async fn claim_address(&self, claim: &AddressClaim) -> Result<ClaimOutcome> {
        let mut inv = self.inventory.lock().unwrap();
        let key = (claim.space_id.clone(), claim.address);
        if inv.addresses.contains_key(&key) {
            drop(inv);
            return self.conflict(format!("{} already exists", claim.address));
        }
        let id = inv.next_id();
        inv.addresses.insert(key, id.clone());
        Ok(ClaimOutcome::Claimed { id })
    }

    async fn subnet_info(&self, id: &str) -> Result<Option<SubnetRecord>> {
        Ok(self.inventory.lock().unwrap().subnets.get(id).cloned())
    }

    async fn update_subnet(&self, changes: &SubnetChanges) -> Result<String> {
        let mut inv = self.inventory.lock().unwrap();
        let subnet = inv
            .subnets
            .get_mut(&changes.id)
            .ok_or_else(|| IpamError::not_found(ObjectKind::Subnet, &changes.id))?;
        subnet.name = changes.name.clone();
        subnet.terminal = changes.terminal;
        subnet.class = changes.class.clone();
        subnet.class_parameters = changes.class_parameters.clone();
        Ok(changes.id.clone())
    }

    async fn delete_subnet(&self, id: &str) -> Result<DeleteOutcome> {
        match self.inventory.lock().unwrap().subnets.remove(id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyGone),
        }
    }

    async fn delete_address(&self, space_name: &str, address: Ipv4Addr) -> Result<DeleteOutcome> {
        let mut inv = self.inventory.lock().unwrap();
        let space_id = inv
            .spaces
            .get(space_name)
            .cloned()
            .ok_or_else(|| IpamError::not_found(ObjectKind::Space, space_name))?;
        match inv.addresses.remove(&(space_id, address)) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyGone),
        }
    }
}
