// src/resources/group.rs
//! User group data source.

use reqwest::Method;
use serde::Serialize;

use crate::client::response::{required_field, text_field};
use crate::client::{params, RestTransport};
use crate::config::constants;
use crate::types::{ObjectKind, Result};
use crate::utils::where_quote;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
}

/// Look up an administrator group by name
pub async fn lookup(transport: &dyn RestTransport, name: &str) -> Result<GroupRecord> {
    let filter = format!("grp_name={}", where_quote(name));
    let record = transport
        .request(Method::GET, constants::GROUP_ADMIN_LIST, params([("WHERE", filter)]))
        .await?
        .into_first(ObjectKind::Group, name)?;

    Ok(GroupRecord {
        id: required_field(&record, "grp_id")?,
        name: text_field(&record, "grp_name").unwrap_or_else(|| name.to_string()),
    })
}
