// src/config/mod.rs
//! Configuration module for the SOLIDserver IPAM provider.
//!
//! This module manages connection settings, constants, and default configurations.

pub mod constants;
pub mod defaults;
pub mod settings;

pub use settings::{CliArgs, Command, ProviderConfig};
