//! Registry of currently connected switches.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::flow::SwitchId;

/// A connected switch.
#[derive(Debug, Clone, Serialize)]
pub struct Switch {
    pub id: SwitchId,
    pub connected_at: DateTime<Utc>,
}

/// Tracks which switches are connected. Entries exist only between the
/// connect and disconnect events; nothing survives a reconnect.
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    switches: HashMap<SwitchId, Switch>,
}

impl SwitchRegistry {
    /// Register a switch. Returns false if it was already registered.
    pub fn register(&mut self, id: SwitchId, connected_at: DateTime<Utc>) -> bool {
        self.switches
            .insert(id, Switch { id, connected_at })
            .is_none()
    }

    pub fn remove(&mut self, id: SwitchId) -> Option<Switch> {
        self.switches.remove(&id)
    }

    pub fn contains(&self, id: SwitchId) -> bool {
        self.switches.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<SwitchId> {
        self.switches.keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<Switch> {
        let mut switches: Vec<Switch> = self.switches.values().cloned().collect();
        switches.sort_by_key(|s| s.id);
        switches
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
