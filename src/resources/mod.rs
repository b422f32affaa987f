// src/resources/mod.rs
//! Managed resources and data sources.
//!
//! Subnets and applications have a full lifecycle; spaces and groups are
//! looked up by name only.

pub mod application;
pub mod class_params;
pub mod group;
pub mod space;
pub mod subnet;

pub use application::{ApplicationConfig, ApplicationResource, ApplicationState};
pub use class_params::ClassParameters;
pub use group::GroupRecord;
pub use space::SpaceRecord;
pub use subnet::{SubnetConfig, SubnetResource, SubnetState};

#[cfg(test)]
mod tests;
