// src/config/constants.rs
//! Application constants and fixed settings.
//!
//! REST paths, header names and wire flags of the SOLIDserver API.

use std::time::Duration;

/// Authentication headers (values are base64 encoded)
pub const USERNAME_HEADER: &str = "x-ipm-username";
pub const PASSWORD_HEADER: &str = "x-ipm-password";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("solidserver-ipam/", env!("CARGO_PKG_VERSION"));

/// IP space endpoints
pub const IP_SITE_LIST: &str = "rest/ip_site_list";

/// IP block and subnet endpoints
pub const IP_BLOCK_SUBNET_LIST: &str = "rest/ip_block_subnet_list";
pub const IP_BLOCK_SUBNET_INFO: &str = "rest/ip_block_subnet_info";
pub const IP_FIND_FREE_SUBNET: &str = "rest/ip_find_free_subnet";
pub const IP_SUBNET_ADD: &str = "rest/ip_subnet_add";
pub const IP_SUBNET_DELETE: &str = "rest/ip_subnet_delete";

/// IP address endpoints
pub const IP_ADD: &str = "rest/ip_add";
pub const IP_DELETE: &str = "rest/ip_delete";

/// Application endpoints
pub const APP_APPLICATION_INFO: &str = "rest/app_application_info";
pub const APP_APPLICATION_ADD: &str = "rest/app_application_add";
pub const APP_APPLICATION_DELETE: &str = "rest/app_application_delete";

/// Group endpoints
pub const GROUP_ADMIN_LIST: &str = "rest/group_admin_list";

/// `add_flag` values
pub const ADD_FLAG_NEW_ONLY: &str = "new_only";
pub const ADD_FLAG_EDIT_ONLY: &str = "edit_only";

/// Field carrying a backend error message
pub const ERRMSG_FIELD: &str = "errmsg";
pub const ERRNO_FIELD: &str = "errno";

/// Field carrying the identifier of a created or updated object
pub const RET_OID_FIELD: &str = "ret_oid";

/// Class parameter holding a subnet's gateway
pub const GATEWAY_CLASS_PARAMETER: &str = "gateway";

/// Connection retry backoff
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
pub const RETRY_JITTER_MAX_MS: u64 = 250;

/// Upper bound on `max_find`
pub const MAX_FIND_LIMIT: u32 = 64;
