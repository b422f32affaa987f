// src/backend.rs
//! Backend operations the subnet lifecycle depends on.
//!
//! [`IpamBackend`] is the seam between the allocation logic and the REST
//! service: lookups, free-range discovery, create-if-absent claims and
//! deletes. [`SolidServerBackend`] implements it over a [`RestTransport`].

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::allocator::candidates;
use crate::client::response::{required_field, text_field};
use crate::client::{params, ApiReply, Params, Record, RestTransport};
use crate::config::constants::{self, ADD_FLAG_EDIT_ONLY, ADD_FLAG_NEW_ONLY};
use crate::network::address;
use crate::resources::class_params::ClassParameters;
use crate::resources::space;
use crate::types::{IpamError, ObjectKind, Result};
use crate::utils::where_quote;

#[cfg(test)]
pub(crate) mod simulated;

/// Container of subnets within a space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBlock {
    pub id: String,
    pub space_id: String,
    pub name: String,
}

/// Create-if-absent request for one subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetClaim {
    pub space_id: String,
    pub block_id: String,
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix_length: u8,
    pub terminal: bool,
    pub class: String,
    pub class_parameters: ClassParameters,
}

/// Create-if-absent request for one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressClaim {
    pub space_id: String,
    pub address: Ipv4Addr,
    pub name: String,
}

/// In-place modification of a subnet's mutable attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetChanges {
    pub id: String,
    pub name: String,
    pub terminal: bool,
    pub class: String,
    pub class_parameters: ClassParameters,
}

/// Subnet as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRecord {
    pub id: String,
    pub space: String,
    pub block: String,
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix_length: u8,
    pub terminal: bool,
    pub class: String,
    pub class_parameters: ClassParameters,
}

/// Result of a create-if-absent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed { id: String },
    /// Someone else holds it, or the backend refused it for a retryable cause
    Conflict { reason: String },
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpamBackend: Send + Sync {
    /// Space identifier for a space name
    async fn find_space(&self, name: &str) -> Result<String>;

    /// Non-terminal block of a space, by name
    async fn find_block(&self, space_id: &str, name: &str) -> Result<AddressBlock>;

    /// Up to `max_find` free base addresses of size `prefix_length`
    async fn find_free_subnets(&self, block: &AddressBlock, prefix_length: u8, max_find: u32) -> Result<Vec<Ipv4Addr>>;

    async fn claim_subnet(&self, claim: &SubnetClaim) -> Result<ClaimOutcome>;

    async fn claim_address(&self, claim: &AddressClaim) -> Result<ClaimOutcome>;

    /// `None` when the subnet no longer exists
    async fn subnet_info(&self, id: &str) -> Result<Option<SubnetRecord>>;

    /// Returns the identifier of the updated subnet
    async fn update_subnet(&self, changes: &SubnetChanges) -> Result<String>;

    async fn delete_subnet(&self, id: &str) -> Result<DeleteOutcome>;

    async fn delete_address(&self, space_name: &str, address: Ipv4Addr) -> Result<DeleteOutcome>;
}

/// HTTP statuses that reject one candidate without condemning the others.
/// A 2xx carrying an `errmsg` created nothing and counts as well.
const RETRYABLE_CLAIM_STATUSES: [u16; 6] = [200, 201, 400, 409, 412, 422];

/// Decide between claimed, conflict and abort for a create-if-absent reply
pub fn classify_claim(reply: ApiReply, what: &str) -> Result<ClaimOutcome> {
    match reply {
        ApiReply::Records { .. } => match reply.created_oid() {
            Some(id) => Ok(ClaimOutcome::Claimed { id }),
            None => Ok(ClaimOutcome::Conflict {
                reason: format!("{} was accepted without an object id", what),
            }),
        },
        ApiReply::Failure(failure) if RETRYABLE_CLAIM_STATUSES.contains(&failure.status) => {
            Ok(ClaimOutcome::Conflict { reason: failure.message })
        }
        ApiReply::Failure(failure) => Err(IpamError::backend(
            failure.status,
            format!("claim of {} failed: {}", what, failure.message),
        )),
        ApiReply::Empty { status } => Err(IpamError::backend(
            status,
            format!("claim of {} returned nothing", what),
        )),
    }
}

/// Map a delete reply; an object that is already gone counts as deleted
pub fn classify_delete(reply: ApiReply, kind: ObjectKind, what: &str) -> Result<DeleteOutcome> {
    match reply {
        ApiReply::Empty { status: 404 } => Ok(DeleteOutcome::AlreadyGone),
        ApiReply::Empty { .. } | ApiReply::Records { .. } => Ok(DeleteOutcome::Deleted),
        ApiReply::Failure(failure) if failure.status == 404 => Ok(DeleteOutcome::AlreadyGone),
        ApiReply::Failure(failure) => Err(failure.into_error(kind, what)),
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// `ip_subnet_add` parameters for a new-only claim
pub fn subnet_claim_params(claim: &SubnetClaim) -> Params {
    params([
        ("site_id", claim.space_id.clone()),
        ("block_id", claim.block_id.clone()),
        ("subnet_name", claim.name.clone()),
        ("subnet_addr", claim.address.to_string()),
        ("subnet_prefix", claim.prefix_length.to_string()),
        ("subnet_class_name", claim.class.clone()),
        ("is_terminal", flag(claim.terminal).to_string()),
        ("add_flag", ADD_FLAG_NEW_ONLY.to_string()),
        ("subnet_class_parameters", claim.class_parameters.encode()),
    ])
}

/// `ip_subnet_add` parameters for an edit-only update
pub fn subnet_update_params(changes: &SubnetChanges) -> Params {
    params([
        ("subnet_id", changes.id.clone()),
        ("subnet_name", changes.name.clone()),
        ("subnet_class_name", changes.class.clone()),
        ("is_terminal", flag(changes.terminal).to_string()),
        ("add_flag", ADD_FLAG_EDIT_ONLY.to_string()),
        ("subnet_class_parameters", changes.class_parameters.encode()),
    ])
}

/// Map an `ip_block_subnet_info` record
pub fn subnet_from_record(id: &str, record: &Record) -> Result<SubnetRecord> {
    let address = address::hex_to_text(&required_field(record, "start_ip_addr")?)?;
    let prefix_length = match text_field(record, "subnet_prefix") {
        Some(prefix) => prefix.parse::<u8>().map_err(|e| {
            IpamError::MalformedAddress(format!("subnet {} prefix '{}': {}", id, prefix, e))
        })?,
        None => prefix_from_size(&required_field(record, "subnet_size")?)?,
    };

    Ok(SubnetRecord {
        id: id.to_string(),
        space: required_field(record, "site_name")?,
        block: text_field(record, "parent_subnet_name").unwrap_or_default(),
        name: required_field(record, "subnet_name")?,
        address: address.parse().map_err(|e| IpamError::MalformedAddress(format!("{}: {}", address, e)))?,
        prefix_length,
        terminal: text_field(record, "is_terminal").as_deref() == Some("1"),
        class: text_field(record, "subnet_class_name").unwrap_or_default(),
        class_parameters: ClassParameters::decode(
            &text_field(record, "subnet_class_parameters").unwrap_or_default(),
        )?,
    })
}

fn prefix_from_size(size: &str) -> Result<u8> {
    let size: u64 = size
        .parse()
        .map_err(|e| IpamError::MalformedAddress(format!("subnet size '{}': {}", size, e)))?;
    if !size.is_power_of_two() || size > 1u64 << 32 {
        return Err(IpamError::MalformedAddress(format!("subnet size {} is not a power of two", size)));
    }
    Ok((32 - size.trailing_zeros()) as u8)
}

/// [`IpamBackend`] over the SOLIDserver REST API
#[derive(Clone)]
pub struct SolidServerBackend {
    transport: Arc<dyn RestTransport>,
}

impl SolidServerBackend {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &dyn RestTransport {
        self.transport.as_ref()
    }
}

#[async_trait]
impl IpamBackend for SolidServerBackend {
    async fn find_space(&self, name: &str) -> Result<String> {
        Ok(space::lookup(self.transport(), name).await?.id)
    }

    async fn find_block(&self, space_id: &str, name: &str) -> Result<AddressBlock> {
        let filter = format!(
            "site_id={} AND subnet_name={} AND is_terminal='0'",
            where_quote(space_id),
            where_quote(name)
        );
        let record = self.transport
            .request(Method::GET, constants::IP_BLOCK_SUBNET_LIST, params([("WHERE", filter)]))
            .await?
            .into_first(ObjectKind::Block, name)?;

        let id = required_field(&record, "subnet_id")?;
        debug!("Resolved block {} to subnet_id {}", name, id);
        Ok(AddressBlock { id, space_id: space_id.to_string(), name: name.to_string() })
    }

    async fn find_free_subnets(&self, block: &AddressBlock, prefix_length: u8, max_find: u32) -> Result<Vec<Ipv4Addr>> {
        let reply = self.transport
            .request(
                Method::GET,
                constants::IP_FIND_FREE_SUBNET,
                candidates::free_subnet_query(block, prefix_length, max_find),
            )
            .await?;

        match reply {
            ApiReply::Empty { .. } => Ok(Vec::new()),
            other => candidates::parse_free_subnets(&other.into_records(ObjectKind::Block, &block.name)?),
        }
    }

    async fn claim_subnet(&self, claim: &SubnetClaim) -> Result<ClaimOutcome> {
        let reply = self.transport
            .request(Method::POST, constants::IP_SUBNET_ADD, subnet_claim_params(claim))
            .await?;
        classify_claim(reply, &format!("{}/{}", claim.address, claim.prefix_length))
    }

    async fn claim_address(&self, claim: &AddressClaim) -> Result<ClaimOutcome> {
        let query = params([
            ("site_id", claim.space_id.clone()),
            ("hostaddr", claim.address.to_string()),
            ("name", claim.name.clone()),
            ("add_flag", ADD_FLAG_NEW_ONLY.to_string()),
        ]);
        let reply = self.transport.request(Method::POST, constants::IP_ADD, query).await?;
        classify_claim(reply, &claim.address.to_string())
    }

    async fn subnet_info(&self, id: &str) -> Result<Option<SubnetRecord>> {
        let reply = self.transport
            .request(Method::GET, constants::IP_BLOCK_SUBNET_INFO, params([("subnet_id", id)]))
            .await?;

        match reply {
            ApiReply::Empty { .. } => Ok(None),
            other => {
                let record = other.into_first(ObjectKind::Subnet, id)?;
                subnet_from_record(id, &record).map(Some)
            }
        }
    }

    async fn update_subnet(&self, changes: &SubnetChanges) -> Result<String> {
        let reply = self.transport
            .request(Method::PUT, constants::IP_SUBNET_ADD, subnet_update_params(changes))
            .await?;

        match reply.created_oid() {
            Some(id) => Ok(id),
            None => {
                reply.into_first(ObjectKind::Subnet, &changes.name)?;
                Err(IpamError::backend(200, format!("update of IP subnet {} returned no id", changes.name)))
            }
        }
    }

    async fn delete_subnet(&self, id: &str) -> Result<DeleteOutcome> {
        let reply = self.transport
            .request(Method::DELETE, constants::IP_SUBNET_DELETE, params([("subnet_id", id)]))
            .await?;
        classify_delete(reply, ObjectKind::Subnet, id)
    }

    async fn delete_address(&self, space_name: &str, address: Ipv4Addr) -> Result<DeleteOutcome> {
        let query = params([("site_name", space_name.to_string()), ("hostaddr", address.to_string())]);
        let reply = self.transport.request(Method::DELETE, constants::IP_DELETE, query).await?;
        classify_delete(reply, ObjectKind::Address, &address.to_string())
    }
}
