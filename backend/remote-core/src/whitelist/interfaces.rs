//! Local network addresses merged into every whitelist.
//!
//! Each platform family has one designated interface whose IPv4 addresses
//! are always allowed, so a node can reach its own RPC port through its LAN
//! address without listing it in the whitelist file.

use std::net::{IpAddr, Ipv4Addr};

use log::trace;
use sysinfo::Networks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl PlatformFamily {
    /// Platform family of the running host.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform family.
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => PlatformFamily::Linux,
            "macos" => PlatformFamily::MacOs,
            "windows" => PlatformFamily::Windows,
            _ => PlatformFamily::Other,
        }
    }

    /// Designated interface for this family, if it has one.
    pub fn interface_name(&self) -> Option<&'static str> {
        match self {
            PlatformFamily::Linux => Some("eth0"),
            PlatformFamily::MacOs => Some("en0"),
            PlatformFamily::Windows => Some("Ethernet"),
            PlatformFamily::Other => None,
        }
    }
}

/// Source of the IPv4 addresses bound to a named interface.
pub trait InterfaceAddresses: Send + Sync {
    /// Addresses of `interface`; empty when the interface does not exist.
    fn ipv4_addresses(&self, interface: &str) -> Vec<Ipv4Addr>;
}

/// Reads interface addresses from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceAddresses for SystemInterfaces {
    fn ipv4_addresses(&self, interface: &str) -> Vec<Ipv4Addr> {
        let networks = Networks::new_with_refreshed_list();

        let Some(data) = networks.list().get(interface) else {
            trace!("Interface {interface} not present on this host");
            return Vec::new();
        };

        data.ip_networks()
            .iter()
            .filter_map(|network| match network.addr {
                IpAddr::V4(address) => Some(address),
                IpAddr::V6(_) => None,
            })
            .collect()
    }
}

/// IPv4 addresses of the designated interface for `platform`.
pub fn local_addresses(
    platform: PlatformFamily,
    interfaces: &dyn InterfaceAddresses,
) -> Vec<Ipv4Addr> {
    match platform.interface_name() {
        Some(name) => interfaces.ipv4_addresses(name),
        None => Vec::new(),
    }
}
