//! Controller aggregate.
//!
//! Owns every mutable table (switch registry, MAC learning table,
//! previous samples, mitigation records) behind one coarse lock and
//! dispatches the events coming in from the protocol adapter. Update
//! rates are low (sub-second frame events, ten-second polling), so a
//! single critical section is plenty and keeps the invariants easy to
//! see.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use metrics::{gauge, increment_counter};
use tokio::sync::{broadcast, mpsc};

use crate::core::flow_mutator::FlowMutator;
use crate::core::forwarding::{self, ForwardingDecision, ObservedFrame};
use crate::core::mac_table::{MacLearningTable, MacTableEntry};
use crate::core::mitigation::{MitigationEngine, MitigationRecord, Transition};
use crate::core::switch_registry::{Switch, SwitchRegistry};
use crate::core::throughput::{MonitoredEntity, PortSample, ThroughputTracker};
use crate::core::{MitigationGranularity, SwitchId};
use crate::models::Config;
use crate::transport::{PortStat, SwitchEvent, SwitchTransport};
use crate::utils::bytes_per_sec_to_mbps;

struct ControllerState {
    registry: SwitchRegistry,
    mac_table: MacLearningTable,
    throughput: ThroughputTracker,
    mitigation: MitigationEngine,
}

pub struct Controller {
    config: Config,
    mutator: FlowMutator,
    state: Mutex<ControllerState>,
}

impl Controller {
    pub fn new(config: Config, transport: Arc<dyn SwitchTransport>) -> Self {
        let mitigation = MitigationEngine::new(config.mitigation.clone());
        Self {
            config,
            mutator: FlowMutator::new(transport),
            state: Mutex::new(ControllerState {
                registry: SwitchRegistry::default(),
                mac_table: MacLearningTable::default(),
                throughput: ThroughputTracker::default(),
                mitigation,
            }),
        }
    }

    pub fn handle_event(&self, event: SwitchEvent) {
        match event {
            SwitchEvent::Connected { switch } => self.on_switch_connected(switch),
            SwitchEvent::Disconnected { switch } => self.on_switch_disconnected(switch),
            SwitchEvent::FrameObserved(frame) => self.on_frame_observed(&frame),
            SwitchEvent::StatsReply { switch, ports } => {
                self.on_stats_reply(switch, ports, Utc::now());
            }
        }
    }

    fn on_switch_connected(&self, switch: SwitchId) {
        let mut state = self.lock_state();
        if !state.registry.register(switch, Utc::now()) {
            debug!("switch {:016x} reconnected without a disconnect", switch);
        }
        info!("switch {:016x} connected, installing table-miss rule", switch);
        self.mutator.install_table_miss(switch);
        gauge!("switches_connected", state.registry.len() as f64);
    }

    fn on_switch_disconnected(&self, switch: SwitchId) {
        let mut state = self.lock_state();
        if state.registry.remove(switch).is_none() {
            debug!("disconnect for unknown switch {:016x}", switch);
            return;
        }
        state.mac_table.remove_switch(switch);
        state.throughput.remove_switch(switch);
        state.mitigation.remove_switch(switch);
        info!("switch {:016x} disconnected, state purged", switch);
        gauge!("switches_connected", state.registry.len() as f64);
        gauge!("entities_blocked", state.mitigation.blocked_count() as f64);
    }

    fn on_frame_observed(&self, frame: &ObservedFrame) {
        increment_counter!("frames_observed_total");
        let mut state = self.lock_state();
        match forwarding::handle_frame(&mut state.mac_table, frame) {
            None => {}
            Some(ForwardingDecision::Unicast {
                install,
                packet_out,
                ..
            }) => {
                self.mutator.install(frame.switch, &install);
                if let Some(packet_out) = packet_out {
                    self.mutator.packet_out(frame.switch, &packet_out);
                }
            }
            Some(ForwardingDecision::Flood { packet_out }) => {
                self.mutator.packet_out(frame.switch, &packet_out);
            }
        }
    }

    /// Run one stats reply through throughput computation and the
    /// mitigation state machine. Public so the pipeline can be driven
    /// with explicit timestamps.
    pub fn on_stats_reply(&self, switch: SwitchId, mut ports: Vec<PortStat>, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        if !state.registry.contains(switch) {
            debug!("stats reply from unregistered switch {:016x}, dropped", switch);
            return;
        }

        ports.sort_by_key(|stat| stat.port);
        for stat in ports {
            let entity = match self.config.mitigation.granularity {
                MitigationGranularity::Port => MonitoredEntity::Port(stat.port),
                MitigationGranularity::Mac => {
                    match state.mac_table.mac_on_port(switch, stat.port) {
                        Some(mac) => MonitoredEntity::Mac(mac),
                        None => {
                            debug!(
                                "no host learned on switch {:016x} port {}, sample discarded",
                                switch, stat.port
                            );
                            continue;
                        }
                    }
                }
            };

            let sample = PortSample {
                rx_bytes: stat.rx_bytes,
                tx_bytes: stat.tx_bytes,
                observed_at: now,
            };
            let Some(rates) = state.throughput.record(switch, entity, sample) else {
                continue;
            };

            info!(
                "throughput on switch {:016x}, {}: RX {:.2} Mbps, TX {:.2} Mbps",
                switch,
                entity,
                bytes_per_sec_to_mbps(rates.rx_bytes_per_sec),
                bytes_per_sec_to_mbps(rates.tx_bytes_per_sec)
            );

            match state.mitigation.evaluate(switch, entity, stat.port, &rates, now) {
                Some(Transition::Block(record)) => {
                    warn!(
                        "high throughput on switch {:016x}, {}: blocking until {} (record {})",
                        switch, entity, record.unblock_deadline, record.id
                    );
                    self.mutator.remove_port_flows(switch, record.in_port);
                    self.mutator.install(switch, &record.rule);
                    increment_counter!("drop_rules_installed_total");
                }
                Some(Transition::Unblock(record)) => {
                    info!(
                        "throughput back under threshold on switch {:016x}, {}: unblocking (record {})",
                        switch, entity, record.id
                    );
                    self.mutator.remove_rule(switch, &record.rule);
                    increment_counter!("drop_rules_removed_total");
                }
                None => {}
            }
            gauge!("entities_blocked", state.mitigation.blocked_count() as f64);
        }
    }

    /// Switches the poller should query this tick.
    pub fn switch_ids(&self) -> Vec<SwitchId> {
        self.lock_state().registry.ids()
    }

    pub fn mutator(&self) -> &FlowMutator {
        &self.mutator
    }

    pub fn switches(&self) -> Vec<Switch> {
        self.lock_state().registry.snapshot()
    }

    pub fn mac_table(&self) -> Vec<MacTableEntry> {
        self.lock_state().mac_table.snapshot()
    }

    pub fn mitigations(&self) -> Vec<MitigationRecord> {
        self.lock_state().mitigation.snapshot()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drain the adapter's event stream into the controller until shutdown
/// or channel close.
pub async fn dispatch_events(
    controller: Arc<Controller>,
    mut events: mpsc::Receiver<SwitchEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => controller.handle_event(event),
                None => {
                    debug!("event channel closed");
                    break;
                }
            },
            _ = shutdown.recv() => {
                info!("event dispatcher stopping");
                break;
            }
        }
    }
}
