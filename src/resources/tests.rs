// src/resources/tests.rs
// Subnet lifecycle against an in-memory backend.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::backend::simulated::SimulatedBackend;
use crate::types::{IpamError, ObjectKind};

fn config(name: &str, gateway_offset: i64) -> SubnetConfig {
    SubnetConfig {
        space: "Local".to_string(),
        block: "LAB".to_string(),
        size: 26,
        name: name.to_string(),
        gateway_offset,
        terminal: true,
        class: "VLAN".to_string(),
        class_parameters: ClassParameters::new().with("vlan", "120"),
    }
}

fn setup() -> (Arc<SimulatedBackend>, SubnetResource) {
    let backend = Arc::new(SimulatedBackend::with_block("Local", "LAB", "172.16.0.0/24"));
    let resource = SubnetResource::new(backend.clone(), 4, Duration::ZERO);
    (backend, resource)
}

#[tokio::test]
async fn test_subnet_lifecycle() {
    let (backend, resource) = setup();

    let created = resource.create(&config("db", -1)).await.unwrap();
    assert_eq!(created.prefix, "172.16.0.0/26");
    assert_eq!(created.gateway, Some("172.16.0.62".parse().unwrap()));
    assert_eq!(backend.address_count(), 1);
    assert!(resource.exists(&created.id).await.unwrap());

    let read = resource.read(&created.id, &config("db", -1)).await.unwrap();
    assert_eq!(read, created);

    let imported = resource.import(&created.id).await.unwrap();
    assert_eq!(imported.gateway_offset, -1);
    assert_eq!(imported.to_config(), config("db", -1));

    let mut renamed = config("db-primary", -1);
    renamed.class_parameters.insert("owner", "dba");
    let updated = resource.update(&read, &renamed).await.unwrap();
    assert_eq!(updated.name, "db-primary");
    // The gateway survives an update that does not mention it
    assert_eq!(resource.import(&created.id).await.unwrap().gateway, created.gateway);

    resource.delete(&updated).await.unwrap();
    assert_eq!(backend.subnet_count(), 0);
    assert_eq!(backend.address_count(), 0);
    assert!(!resource.exists(&created.id).await.unwrap());

    // Deleting twice is not an error
    resource.delete(&updated).await.unwrap();
}

#[tokio::test]
async fn test_second_subnet_takes_next_range() {
    let (_, resource) = setup();

    let first = resource.create(&config("a", 1)).await.unwrap();
    let second = resource.create(&config("b", 1)).await.unwrap();
    assert_eq!(first.address, "172.16.0.0".parse::<Ipv4Addr>().unwrap());
    assert_eq!(second.address, "172.16.0.64".parse::<Ipv4Addr>().unwrap());
    assert_eq!(second.gateway, Some("172.16.0.65".parse().unwrap()));
}

#[tokio::test]
async fn test_taken_gateway_rolls_back_subnet() {
    let (backend, resource) = setup();
    backend.occupy_address("Local", "172.16.0.62".parse().unwrap());

    let err = resource.create(&config("db", -1)).await.unwrap_err();
    assert!(matches!(err, IpamError::Conflict { .. }));
    assert_eq!(backend.subnet_count(), 0);
    assert_eq!(backend.address_count(), 1);
}

#[tokio::test]
async fn test_unknown_space() {
    let (backend, resource) = setup();
    let mut config = config("db", 0);
    config.space = "Remote".to_string();

    let err = resource.create(&config).await.unwrap_err();
    assert!(matches!(err, IpamError::NotFound { kind: ObjectKind::Space, ref name } if name == "Remote"));
    assert_eq!(backend.subnet_claims(), 0);
}

#[test]
fn test_exists_on_unknown_id() {
    let (_, resource) = setup();
    assert!(!tokio_test::block_on(resource.exists("999")).unwrap());
}
