// src/network/gateway.rs
//! Gateway derivation from a signed offset.
//!
//! A positive offset counts forward from the subnet's base address, a
//! negative one counts back from its last (broadcast) address, and zero
//! means no gateway.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use tracing::debug;

use crate::network::address;
use crate::types::{IpamError, Result};

/// Compute the gateway of `base/prefix_length` for a signed offset
pub fn gateway_address(base: Ipv4Addr, prefix_length: u8, offset: i64) -> Result<Option<Ipv4Addr>> {
    if offset == 0 {
        return Ok(None);
    }

    let size = address::prefix_size(prefix_length)?;
    let packed = u32::from(base);
    let magnitude = offset.unsigned_abs();

    let gateway = if offset > 0 {
        address::offset_from_start(packed, size, magnitude)?
    } else {
        address::offset_from_end(packed, size, magnitude)?
    };
    let gateway = Ipv4Addr::from(gateway);

    let network = Ipv4Network::new(base, prefix_length)
        .map_err(|e| IpamError::MalformedAddress(format!("{}/{}: {}", base, prefix_length, e)))?;
    if gateway == network.network() {
        return Err(IpamError::MalformedAddress(format!(
            "gateway offset {} lands on the base address of {}", offset, network
        )));
    }
    if !network.contains(gateway) {
        return Err(IpamError::MalformedAddress(format!(
            "gateway {} is not inside {}; is {} the subnet's base address?",
            gateway, network, base
        )));
    }

    debug!("Computed gateway {} for {} (offset {})", gateway, network, offset);
    Ok(Some(gateway))
}

/// Offset that yields `gateway` in `base/prefix_length`, preferring the
/// smaller magnitude and the positive form on ties
pub fn offset_of(base: Ipv4Addr, prefix_length: u8, gateway: Ipv4Addr) -> Result<i64> {
    let size = address::prefix_size(prefix_length)?;
    let start = u64::from(u32::from(base));
    let last = start + size - 1;
    let gw = u64::from(u32::from(gateway));

    if gw <= start || gw > last {
        return Err(IpamError::MalformedAddress(format!(
            "gateway {} is not a host of {}/{}", gateway, base, prefix_length
        )));
    }

    let forward = gw - start;
    let backward = last - gw;
    if backward > 0 && backward < forward {
        Ok(-(backward as i64))
    } else {
        Ok(forward as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("10.0.0.1", 1)]
    #[test_case("10.0.0.254", -1)]
    #[test_case("10.0.0.200", -55)]
    #[test_case("10.0.0.100", 100)]
    #[test_case("10.0.0.255", 255; "last address has no negative form")]
    fn test_offset_of(gateway: &str, expected: i64) {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        let gateway: Ipv4Addr = gateway.parse().unwrap();
        let offset = offset_of(base, 24, gateway).unwrap();
        assert_eq!(offset, expected);
        assert_eq!(gateway_address(base, 24, offset).unwrap(), Some(gateway));
    }

    #[test]
    fn test_offset_of_outside() {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        assert!(offset_of(base, 24, "10.0.0.0".parse().unwrap()).is_err());
        assert!(offset_of(base, 24, "10.0.1.1".parse().unwrap()).is_err());
    }

    #[test_case(1, Some("10.0.0.1"); "first host")]
    #[test_case(-1, Some("10.0.0.254"); "last host")]
    #[test_case(10, Some("10.0.0.10"); "forward ten")]
    #[test_case(-2, Some("10.0.0.253"); "back two")]
    #[test_case(0, None; "no gateway")]
    fn test_gateway_on_slash_24(offset: i64, expected: Option<&str>) {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        let gateway = gateway_address(base, 24, offset).unwrap();
        assert_eq!(gateway, expected.map(|g| g.parse::<Ipv4Addr>().unwrap()));
    }

    #[test]
    fn test_gateway_on_small_subnet() {
        let base: Ipv4Addr = "192.168.4.8".parse().unwrap();
        assert_eq!(gateway_address(base, 29, -1).unwrap(), Some("192.168.4.14".parse().unwrap()));
        assert_eq!(gateway_address(base, 29, 1).unwrap(), Some("192.168.4.9".parse().unwrap()));
    }

    #[test]
    fn test_offset_outside_subnet_is_rejected() {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        assert!(matches!(gateway_address(base, 24, 256), Err(IpamError::MalformedAddress(_))));
        assert!(matches!(gateway_address(base, 24, -256), Err(IpamError::MalformedAddress(_))));
        assert!(matches!(gateway_address(base, 32, 1), Err(IpamError::MalformedAddress(_))));
    }

    #[test]
    fn test_base_address_is_never_a_gateway() {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        assert!(matches!(gateway_address(base, 31, -1), Err(IpamError::MalformedAddress(_))));
        assert!(matches!(gateway_address(base, 30, -3), Err(IpamError::MalformedAddress(_))));

        let gateway = gateway_address(base, 31, 1).unwrap().unwrap();
        assert_eq!(gateway, "10.0.0.1".parse::<Ipv4Addr>().unwrap());
        assert_eq!(offset_of(base, 31, gateway).unwrap(), 1);
    }

    #[test]
    fn test_extreme_offset_does_not_overflow() {
        let base: Ipv4Addr = "10.0.0.0".parse().unwrap();
        assert!(gateway_address(base, 24, i64::MIN).is_err());
        assert!(gateway_address(base, 24, i64::MAX).is_err());
    }

    #[test]
    fn test_unaligned_base_is_rejected() {
        let base: Ipv4Addr = "10.0.0.200".parse().unwrap();
        assert!(gateway_address(base, 24, 100).is_err());
    }
}
