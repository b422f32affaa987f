// src/resources/space.rs
//! IP space data source.

use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use crate::client::response::{required_field, text_field};
use crate::client::{params, RestTransport};
use crate::config::constants;
use crate::resources::class_params::ClassParameters;
use crate::types::{ObjectKind, Result};
use crate::utils::where_quote;

/// An IP space as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRecord {
    pub id: String,
    pub name: String,
    pub class: String,
    pub class_parameters: ClassParameters,
}

/// Look up a space by name
pub async fn lookup(transport: &dyn RestTransport, name: &str) -> Result<SpaceRecord> {
    debug!("Looking for space: {}", name);

    let filter = format!("site_name={}", where_quote(name));
    let record = transport
        .request(Method::GET, constants::IP_SITE_LIST, params([("WHERE", filter)]))
        .await?
        .into_first(ObjectKind::Space, name)?;

    Ok(SpaceRecord {
        id: required_field(&record, "site_id")?,
        name: text_field(&record, "site_name").unwrap_or_else(|| name.to_string()),
        class: text_field(&record, "site_class_name").unwrap_or_default(),
        class_parameters: ClassParameters::decode(
            &text_field(&record, "site_class_parameters").unwrap_or_default(),
        )?,
    })
}
