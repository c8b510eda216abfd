// Unit tests for remote-core internals.
// Lifecycle tests against a recording RPC server live in integration_tests/.

mod whitelist;

use crate::whitelist::InterfaceAddresses;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Interface table fixed at construction, in place of the host's interfaces.
#[derive(Debug, Default)]
pub(crate) struct FixedInterfaces {
    table: HashMap<String, Vec<Ipv4Addr>>,
}

impl FixedInterfaces {
    pub(crate) fn with(mut self, interface: &str, addresses: &[Ipv4Addr]) -> Self {
        self.table
            .insert(interface.to_string(), addresses.to_vec());
        self
    }
}

impl InterfaceAddresses for FixedInterfaces {
    fn ipv4_addresses(&self, interface: &str) -> Vec<Ipv4Addr> {
        self.table.get(interface).cloned().unwrap_or_default()
    }
}

pub(crate) fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}
