// Export all modules for public use
pub mod allocator;
pub mod backend;
pub mod client;
pub mod config;
pub mod network;
pub mod resources;
pub mod types;
pub mod utils;

// Re-export the most commonly used items for convenience
pub use crate::allocator::{Allocation, SubnetAllocator, SubnetRequest};
pub use crate::backend::{IpamBackend, SolidServerBackend};
pub use crate::client::{RestTransport, SolidServerClient};
pub use crate::config::ProviderConfig;
pub use crate::resources::{ApplicationResource, SubnetConfig, SubnetResource, SubnetState};
pub use crate::types::{IpamError, ObjectKind, Result};
