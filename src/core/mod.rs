//! Core control-plane logic.
//!
//! This module contains the core components of the controller: MAC
//! learning and forwarding, the stats poller, throughput computation,
//! the mitigation state machine, and the flow-table mutator.

pub mod controller;
pub mod flow;
pub mod flow_mutator;
pub mod forwarding;
pub mod mac_table;
pub mod mitigation;
pub mod stats_poller;
pub mod switch_registry;
pub mod throughput;

use serde::{Deserialize, Serialize};

/// What a mitigation drop rule is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationGranularity {
    /// Block the whole ingress port.
    Port,
    /// Block the host learned behind the port, by source address.
    Mac,
}

/// How the two traffic directions are compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationPolicy {
    /// Breach when either direction exceeds the threshold on its own.
    IndependentRxTx,
    /// Breach when the sum of both directions exceeds the threshold.
    Combined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitigationConfig {
    /// Throughput above which an entity is blocked (bytes per second).
    pub threshold_bytes_per_sec: u64,
    /// Minimum time a blocked entity stays blocked.
    pub cooldown_seconds: u64,
    pub granularity: MitigationGranularity,
    pub policy: MitigationPolicy,
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            threshold_bytes_per_sec: 1_000_000,
            cooldown_seconds: 60,
            granularity: MitigationGranularity::Port,
            policy: MitigationPolicy::IndependentRxTx,
        }
    }
}

pub use controller::Controller;
pub use flow::{FlowAction, FlowMatch, FlowRule, MacAddr, PacketOut, PortNo, SwitchId};
pub use flow_mutator::FlowMutator;
pub use forwarding::{ForwardingDecision, ObservedFrame};
pub use mitigation::{MitigationEngine, MitigationRecord};
pub use stats_poller::StatsPoller;
pub use switch_registry::{Switch, SwitchRegistry};
pub use throughput::{MonitoredEntity, PortSample, Throughput, ThroughputTracker};
