// src/config/defaults.rs
//! Default configurations for the SOLIDserver IPAM provider.
//!
//! This module provides sensible default values for configuration settings
//! when not explicitly specified by the user.

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after a connection failure
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of free subnet candidates requested per allocation
pub const DEFAULT_MAX_FIND: u32 = 4;

/// Default upper bound of the randomized delay before each claim, in milliseconds
pub const DEFAULT_CLAIM_JITTER_MS: u64 = 1000;

/// Verify the appliance's TLS certificate unless told otherwise
pub const DEFAULT_SSL_VERIFY: bool = true;

/// Subnets are created terminal unless told otherwise
pub const DEFAULT_TERMINAL: bool = true;
