// src/resources/subnet.rs
//! IP subnet resource.
//!
//! Creation resolves the space and block names, hands the request to the
//! [`SubnetAllocator`], then claims the gateway as a dependent address.
//! Teardown releases the gateway first (best effort) and the subnet last.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allocator::{Allocation, SubnetAllocator, SubnetRequest};
use crate::backend::{AddressClaim, ClaimOutcome, DeleteOutcome, IpamBackend, SubnetChanges, SubnetRecord};
use crate::config::constants::GATEWAY_CLASS_PARAMETER;
use crate::config::defaults;
use crate::network::{self, gateway};
use crate::resources::class_params::ClassParameters;
use crate::types::{IpamError, ObjectKind, Result};

fn default_terminal() -> bool {
    defaults::DEFAULT_TERMINAL
}

/// Desired state of a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetConfig {
    /// Name of the space to create the subnet in
    pub space: String,
    /// Name of the parent block
    pub block: String,
    /// Prefix length (24 for a /24)
    pub size: u8,
    pub name: String,
    /// Signed gateway offset, 0 for no gateway
    #[serde(default)]
    pub gateway_offset: i64,
    #[serde(default = "default_terminal")]
    pub terminal: bool,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub class_parameters: ClassParameters,
}

/// Observed state of a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetState {
    pub id: String,
    pub space: String,
    pub block: String,
    pub size: u8,
    pub name: String,
    pub address: Ipv4Addr,
    /// CIDR notation of the claimed range
    pub prefix: String,
    pub gateway_offset: i64,
    pub gateway: Option<Ipv4Addr>,
    pub terminal: bool,
    pub class: String,
    pub class_parameters: ClassParameters,
}

impl SubnetState {
    /// Configuration that reproduces this state
    pub fn to_config(&self) -> SubnetConfig {
        SubnetConfig {
            space: self.space.clone(),
            block: self.block.clone(),
            size: self.size,
            name: self.name.clone(),
            gateway_offset: self.gateway_offset,
            terminal: self.terminal,
            class: self.class.clone(),
            class_parameters: self.class_parameters.clone(),
        }
    }
}

/// Whether moving from `state` to `config` needs a new subnet
pub fn requires_replacement(state: &SubnetState, config: &SubnetConfig) -> bool {
    state.space != config.space
        || state.block != config.block
        || state.size != config.size
        || state.gateway_offset != config.gateway_offset
        || state.terminal != config.terminal
}

/// Subnet lifecycle
#[derive(Clone)]
pub struct SubnetResource {
    backend: Arc<dyn IpamBackend>,
    allocator: SubnetAllocator,
}

impl SubnetResource {
    pub fn new(backend: Arc<dyn IpamBackend>, max_find: u32, claim_jitter: Duration) -> Self {
        let allocator = SubnetAllocator::new(backend.clone(), max_find, claim_jitter);
        Self { backend, allocator }
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        debug!("Checking existence of IP subnet (oid): {}", id);
        match self.backend.subnet_info(id).await {
            Ok(record) => Ok(record.is_some()),
            Err(IpamError::Backend { status, message }) => {
                debug!("Unable to find IP subnet (oid): {} (HTTP {}: {})", id, status, message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Allocate a free subnet, then claim its gateway if one is configured.
    ///
    /// If the gateway claim fails the subnet is released again and the
    /// gateway error is returned.
    pub async fn create(&self, config: &SubnetConfig) -> Result<SubnetState> {
        let space_id = self.backend.find_space(&config.space).await?;
        let block = self.backend.find_block(&space_id, &config.block).await?;

        let request = SubnetRequest {
            block,
            name: config.name.clone(),
            prefix_length: config.size,
            terminal: config.terminal,
            class: config.class.clone(),
            class_parameters: config.class_parameters.clone(),
            gateway_offset: config.gateway_offset,
        };
        let allocation = self.allocator.allocate(&request).await?;

        if let Some(gateway) = allocation.gateway {
            if let Err(e) = self.claim_gateway(&space_id, &config.name, gateway).await {
                warn!("Gateway {} of IP subnet {} could not be claimed: {}", gateway, config.name, e);
                self.release_after_failure(&allocation).await;
                return Err(e);
            }
        }

        info!("Created IP subnet {} (oid): {}", config.name, allocation.subnet_id);
        Ok(SubnetState {
            id: allocation.subnet_id,
            space: config.space.clone(),
            block: config.block.clone(),
            size: allocation.prefix_length,
            name: config.name.clone(),
            address: allocation.address,
            prefix: network::cidr(allocation.address, allocation.prefix_length)?,
            gateway_offset: config.gateway_offset,
            gateway: allocation.gateway,
            terminal: config.terminal,
            class: config.class.clone(),
            class_parameters: config.class_parameters.clone(),
        })
    }

    async fn claim_gateway(&self, space_id: &str, subnet_name: &str, gateway: Ipv4Addr) -> Result<()> {
        let claim = AddressClaim {
            space_id: space_id.to_string(),
            address: gateway,
            name: format!("{} gateway", subnet_name),
        };
        match self.backend.claim_address(&claim).await? {
            ClaimOutcome::Claimed { id } => {
                debug!("Claimed gateway {} (oid): {}", gateway, id);
                Ok(())
            }
            ClaimOutcome::Conflict { reason } => Err(IpamError::Conflict {
                what: format!("gateway {} ({})", gateway, reason),
            }),
        }
    }

    // Cleanup failures are logged so they never mask the original error
    async fn release_after_failure(&self, allocation: &Allocation) {
        match self.backend.delete_subnet(&allocation.subnet_id).await {
            Ok(_) => info!(
                "Released IP subnet {}/{} (oid {}) after gateway failure",
                allocation.address, allocation.prefix_length, allocation.subnet_id
            ),
            Err(e) => warn!(
                "Unable to release IP subnet {}/{} (oid {}): {}",
                allocation.address, allocation.prefix_length, allocation.subnet_id, e
            ),
        }
    }

    /// Read back a subnet, keeping only the configured class parameters
    pub async fn read(&self, id: &str, config: &SubnetConfig) -> Result<SubnetState> {
        let record = self.fetch(id).await?;
        let gateway = recorded_gateway(&record);

        Ok(SubnetState {
            prefix: network::cidr(record.address, record.prefix_length)?,
            gateway_offset: config.gateway_offset,
            gateway,
            class_parameters: record.class_parameters.project(&config.class_parameters),
            ..state_from_record(record)
        })
    }

    /// Read a subnet from its identifier alone.
    ///
    /// Every class parameter except the gateway is kept, and the gateway
    /// offset is inferred from the recorded gateway.
    pub async fn import(&self, id: &str) -> Result<SubnetState> {
        let mut record = self.fetch(id).await?;
        let gateway = recorded_gateway(&record);
        record.class_parameters.remove(GATEWAY_CLASS_PARAMETER);

        let gateway_offset = match gateway {
            Some(gw) => match gateway::offset_of(record.address, record.prefix_length, gw) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("IP subnet {} records gateway {} that no offset reaches: {}", record.id, gw, e);
                    0
                }
            },
            None => 0,
        };

        Ok(SubnetState {
            prefix: network::cidr(record.address, record.prefix_length)?,
            gateway_offset,
            gateway,
            ..state_from_record(record)
        })
    }

    /// Update name, class and class parameters in place
    pub async fn update(&self, state: &SubnetState, config: &SubnetConfig) -> Result<SubnetState> {
        if requires_replacement(state, config) {
            return Err(IpamError::Config(format!(
                "IP subnet {}: space, block, size, gateway offset and terminal flag cannot change in place",
                state.id
            )));
        }

        let class_parameters = match state.gateway {
            Some(gw) => config.class_parameters.with(GATEWAY_CLASS_PARAMETER, gw.to_string()),
            None => config.class_parameters.clone(),
        };
        let changes = SubnetChanges {
            id: state.id.clone(),
            name: config.name.clone(),
            terminal: config.terminal,
            class: config.class.clone(),
            class_parameters,
        };

        let id = self.backend.update_subnet(&changes).await?;
        info!("Updated IP subnet {} (oid): {}", config.name, id);

        Ok(SubnetState {
            id,
            name: config.name.clone(),
            class: config.class.clone(),
            class_parameters: config.class_parameters.clone(),
            ..state.clone()
        })
    }

    /// Release the gateway (best effort), then the subnet
    pub async fn delete(&self, state: &SubnetState) -> Result<()> {
        if let Some(gateway) = state.gateway {
            match self.backend.delete_address(&state.space, gateway).await {
                Ok(DeleteOutcome::Deleted) => debug!("Deleted IP subnet's gateway: {}", gateway),
                Ok(DeleteOutcome::AlreadyGone) => debug!("IP subnet's gateway {} was already gone", gateway),
                Err(e) => warn!("Unable to delete IP subnet's gateway {}: {}", gateway, e),
            }
        }

        match self.backend.delete_subnet(&state.id).await? {
            DeleteOutcome::Deleted => info!("Deleted IP subnet {} (oid): {}", state.name, state.id),
            DeleteOutcome::AlreadyGone => info!("IP subnet {} (oid {}) was already gone", state.name, state.id),
        }
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<SubnetRecord> {
        self.backend
            .subnet_info(id)
            .await?
            .ok_or_else(|| IpamError::not_found(ObjectKind::Subnet, id))
    }
}

fn recorded_gateway(record: &SubnetRecord) -> Option<Ipv4Addr> {
    let raw = record.class_parameters.get(GATEWAY_CLASS_PARAMETER)?;
    match raw.parse() {
        Ok(gw) => Some(gw),
        Err(_) => {
            warn!("IP subnet {} carries an unparsable gateway '{}'", record.id, raw);
            None
        }
    }
}

fn state_from_record(record: SubnetRecord) -> SubnetState {
    SubnetState {
        id: record.id,
        space: record.space,
        block: record.block,
        size: record.prefix_length,
        name: record.name,
        address: record.address,
        prefix: String::new(),
        gateway_offset: 0,
        gateway: None,
        terminal: record.terminal,
        class: record.class,
        class_parameters: record.class_parameters,
    }
}
