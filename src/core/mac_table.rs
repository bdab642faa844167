//! MAC learning table.
//!
//! Per-switch mapping of source address to ingress port, built from
//! observed frames. Entries are overwritten on every observation and are
//! never aged out; a host move simply rewrites the entry on its next
//! frame.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::flow::{MacAddr, PortNo, SwitchId};

/// One learned (switch, mac, port) association, as exposed by the status
/// API.
#[derive(Debug, Clone, Serialize)]
pub struct MacTableEntry {
    pub switch: SwitchId,
    pub mac: MacAddr,
    pub port: PortNo,
}

#[derive(Debug, Default)]
pub struct MacLearningTable {
    tables: HashMap<SwitchId, HashMap<MacAddr, PortNo>>,
}

impl MacLearningTable {
    /// Record that `mac` was seen entering `switch` on `port`. Last write
    /// wins; there is no conflict detection.
    pub fn learn(&mut self, switch: SwitchId, mac: MacAddr, port: PortNo) {
        self.tables.entry(switch).or_default().insert(mac, port);
    }

    pub fn lookup(&self, switch: SwitchId, mac: MacAddr) -> Option<PortNo> {
        self.tables.get(&switch)?.get(&mac).copied()
    }

    /// Reverse lookup for per-host mitigation: the MAC currently learned
    /// on `port`. When several hosts share the port the lowest address
    /// wins, so repeated calls stay stable.
    pub fn mac_on_port(&self, switch: SwitchId, port: PortNo) -> Option<MacAddr> {
        self.tables
            .get(&switch)?
            .iter()
            .filter(|(_, p)| **p == port)
            .map(|(mac, _)| *mac)
            .min()
    }

    /// Drop every entry learned for `switch`.
    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.tables.remove(&switch);
    }

    pub fn snapshot(&self) -> Vec<MacTableEntry> {
        let mut entries: Vec<MacTableEntry> = self
            .tables
            .iter()
            .flat_map(|(switch, table)| {
                table.iter().map(|(mac, port)| MacTableEntry {
                    switch: *switch,
                    mac: *mac,
                    port: *port,
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.switch, e.mac));
        entries
    }
}
