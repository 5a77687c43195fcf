//! Helpers shared by the getifaddrs(3) based backends

use super::InterfaceFlag;
use crate::error::{Error, Result};
use std::net::{SocketAddrV4, SocketAddrV6};

const FLAG_BITS: [(libc::c_int, InterfaceFlag); 5] = [
    (libc::IFF_UP, InterfaceFlag::Up),
    (libc::IFF_BROADCAST, InterfaceFlag::Broadcast),
    (libc::IFF_LOOPBACK, InterfaceFlag::Loopback),
    (libc::IFF_POINTOPOINT, InterfaceFlag::PointToPoint),
    (libc::IFF_MULTICAST, InterfaceFlag::Multicast),
];

/// Map an `IFF_*` bitmask to the reported flags
pub(crate) fn flags_from_bits(bits: libc::c_int) -> Vec<InterfaceFlag> {
    FLAG_BITS
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, flag)| *flag)
        .collect()
}

/// Addresses assigned to `name`, in `ip/prefix` form
pub(crate) fn read_addresses(name: &str) -> Result<Vec<String>> {
    let addrs = nix::ifaddrs::getifaddrs()
        .map_err(|e| Error::detail(name, format!("getifaddrs failed: {}", e)))?;

    let mut result = Vec::new();
    for ifa in addrs.filter(|ifa| ifa.interface_name == name) {
        let Some(address) = ifa.address else {
            continue;
        };

        if let Some(sin) = address.as_sockaddr_in() {
            let ip = *SocketAddrV4::from(*sin).ip();
            let prefix = ifa
                .netmask
                .as_ref()
                .and_then(|m| m.as_sockaddr_in())
                .map(|m| u32::from(*SocketAddrV4::from(*m).ip()).count_ones())
                .unwrap_or(32);
            result.push(format!("{}/{}", ip, prefix));
        } else if let Some(sin6) = address.as_sockaddr_in6() {
            let ip = *SocketAddrV6::from(*sin6).ip();
            let prefix = ifa
                .netmask
                .as_ref()
                .and_then(|m| m.as_sockaddr_in6())
                .map(|m| u128::from(*SocketAddrV6::from(*m).ip()).count_ones())
                .unwrap_or(128);
            result.push(format!("{}/{}", ip, prefix));
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_bits() {
        assert_eq!(
            flags_from_bits(libc::IFF_UP | libc::IFF_BROADCAST | libc::IFF_MULTICAST),
            vec![
                InterfaceFlag::Up,
                InterfaceFlag::Broadcast,
                InterfaceFlag::Multicast
            ]
        );
        assert_eq!(
            flags_from_bits(libc::IFF_UP | libc::IFF_LOOPBACK),
            vec![InterfaceFlag::Up, InterfaceFlag::Loopback]
        );
        assert!(flags_from_bits(0).is_empty());
    }

    #[test]
    fn test_unknown_interface_has_no_addresses() {
        assert!(read_addresses("ifw-missing0").unwrap().is_empty());
    }
}
