// src/config/settings.rs
//! Provider configuration settings.
//!
//! This module contains the command line surface and the provider
//! configuration, loaded from an optional JSON file, overridden by flags
//! and `SOLIDSERVER_*` environment variables, then validated.

use clap::{ArgAction, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{constants, defaults};

/// Error type for configuration-related operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a `key=value` class parameter
fn parse_class_parameter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

/// IP subnet lifecycle commands
#[derive(Subcommand, Debug, Clone)]
pub enum SubnetCommand {
    /// Allocate and claim a free subnet inside a block
    Create {
        /// Name of the IP space
        #[clap(long)]
        space: String,

        /// Name of the parent block
        #[clap(long)]
        block: String,

        /// Prefix length of the subnet (24 for a /24)
        #[clap(long)]
        size: u8,

        /// Name of the subnet
        #[clap(long)]
        name: String,

        /// Gateway offset, negative values count back from the last address
        #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
        gateway_offset: i64,

        /// Terminal flag of the subnet
        #[clap(long, default_value_t = defaults::DEFAULT_TERMINAL, action = ArgAction::Set)]
        terminal: bool,

        /// Class of the subnet
        #[clap(long, default_value = "")]
        class: String,

        /// Class parameter, repeatable
        #[clap(long = "param", value_parser = parse_class_parameter)]
        params: Vec<(String, String)>,
    },

    /// Print a subnet's attributes
    Show { id: String },

    /// Check whether a subnet still exists
    Exists { id: String },

    /// Update a subnet's mutable attributes in place
    Update {
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        class: Option<String>,

        #[clap(long = "param", value_parser = parse_class_parameter)]
        params: Vec<(String, String)>,
    },

    /// Release a subnet and its gateway
    Delete { id: String },
}

/// Application lifecycle commands
#[derive(Subcommand, Debug, Clone)]
pub enum ApplicationCommand {
    /// Create an application
    Create {
        #[clap(long)]
        name: String,

        #[clap(long, default_value = "")]
        class: String,

        #[clap(long = "param", value_parser = parse_class_parameter)]
        params: Vec<(String, String)>,
    },

    /// Print an application's attributes
    Show { id: String },

    /// Check whether an application still exists
    Exists { id: String },

    /// Update an application in place
    Update {
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        class: Option<String>,

        #[clap(long = "param", value_parser = parse_class_parameter)]
        params: Vec<(String, String)>,
    },

    /// Delete an application
    Delete { id: String },
}

/// Command enum for subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage IP subnets
    #[clap(subcommand)]
    Subnet(SubnetCommand),

    /// Manage applications
    #[clap(subcommand)]
    Application(ApplicationCommand),

    /// Look up an IP space by name
    Space { name: String },

    /// Look up a user group by name
    Group { name: String },
}

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "ipamctl",
    about = "Declarative IP space, subnet and application management against SOLIDserver",
    version,
    author
)]
pub struct CliArgs {
    /// SOLIDserver host name or base URL
    #[clap(long, env = "SOLIDSERVER_HOST")]
    pub host: Option<String>,

    /// API user name
    #[clap(long, env = "SOLIDSERVER_USERNAME")]
    pub username: Option<String>,

    /// API password
    #[clap(long, env = "SOLIDSERVER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Verify the appliance's TLS certificate
    #[clap(long, env = "SOLIDSERVER_SSLVERIFY")]
    pub ssl_verify: Option<bool>,

    /// Request timeout in seconds
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Retries after a connection failure
    #[clap(long)]
    pub max_retries: Option<u32>,

    /// Free subnet candidates requested per allocation
    #[clap(long)]
    pub max_find: Option<u32>,

    /// Upper bound of the randomized pre-claim delay in milliseconds (0 disables)
    #[clap(long)]
    pub claim_jitter_ms: Option<u64>,

    /// Log level
    #[clap(long, default_value = defaults::DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Also write logs to this file (rotated daily)
    #[clap(long)]
    pub log_file: Option<String>,

    /// Configuration file path
    #[clap(long)]
    pub config_file: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

fn default_ssl_verify() -> bool {
    defaults::DEFAULT_SSL_VERIFY
}

fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    defaults::DEFAULT_MAX_RETRIES
}

fn default_max_find() -> u32 {
    defaults::DEFAULT_MAX_FIND
}

fn default_claim_jitter_ms() -> u64 {
    defaults::DEFAULT_CLAIM_JITTER_MS
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// SOLIDserver host name or base URL
    #[serde(default)]
    pub host: String,

    /// API user name
    #[serde(default)]
    pub username: String,

    /// API password
    #[serde(default)]
    pub password: String,

    /// Verify the appliance's TLS certificate
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a connection failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Free subnet candidates requested per allocation
    #[serde(default = "default_max_find")]
    pub max_find: u32,

    /// Upper bound of the randomized pre-claim delay in milliseconds
    #[serde(default = "default_claim_jitter_ms")]
    pub claim_jitter_ms: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            ssl_verify: defaults::DEFAULT_SSL_VERIFY,
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            max_find: defaults::DEFAULT_MAX_FIND,
            claim_jitter_ms: defaults::DEFAULT_CLAIM_JITTER_MS,
            log_level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl ProviderConfig {
    /// Create a provider configuration from command line arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        // Check for configuration file first
        let mut config = match &args.config_file {
            Some(path) => Self::read_file(Path::new(path))?,
            None => Self::default(),
        };

        // Override with command line arguments and environment if provided
        if let Some(host) = &args.host {
            config.host = host.clone();
        }
        if let Some(username) = &args.username {
            config.username = username.clone();
        }
        if let Some(password) = &args.password {
            config.password = password.clone();
        }
        if let Some(ssl_verify) = args.ssl_verify {
            config.ssl_verify = ssl_verify;
        }
        if let Some(timeout) = args.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(max_retries) = args.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(max_find) = args.max_find {
            config.max_find = max_find;
        }
        if let Some(jitter) = args.claim_jitter_ms {
            config.claim_jitter_ms = jitter;
        }
        if args.log_level != defaults::DEFAULT_LOG_LEVEL {
            config.log_level = args.log_level.clone();
        }
        if let Some(log_file) = &args.log_file {
            config.log_file = Some(PathBuf::from(log_file));
        }

        // Validate the config
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "SOLIDserver host is required (--host or SOLIDSERVER_HOST)".to_string()
            ));
        }

        if self.username.is_empty() {
            return Err(ConfigError::Invalid(
                "API user name is required (--username or SOLIDSERVER_USERNAME)".to_string()
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("Request timeout must be at least 1 second".to_string()));
        }

        if self.max_find == 0 || self.max_find > constants::MAX_FIND_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_find must be between 1 and {}, got {}",
                constants::MAX_FIND_LIMIT, self.max_find
            )));
        }

        Ok(())
    }

    /// Base URL of the REST API, defaulting to HTTPS for bare host names
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn claim_jitter(&self) -> Duration {
        Duration::from_millis(self.claim_jitter_ms)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
