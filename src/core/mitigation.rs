//! Mitigation state machine.
//!
//! Every monitored entity is NORMAL until a sampling interval shows its
//! throughput above the configured threshold; it is then BLOCKED by a
//! drop rule until a later interval shows it back at or below the
//! threshold and the cooldown deadline has passed. NORMAL is implicit: a
//! record exists exactly while the entity is blocked, and the installed
//! rule lives inside the record, so a record without a rule cannot be
//! represented.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::Serialize;
use uuid::Uuid;

use crate::core::flow::{FlowMatch, FlowRule, PortNo, SwitchId};
use crate::core::throughput::{MonitoredEntity, Throughput};
use crate::core::{MitigationConfig, MitigationPolicy};

/// An entity currently under mitigation.
#[derive(Debug, Clone, Serialize)]
pub struct MitigationRecord {
    /// Correlation id for logs and the status API.
    pub id: Uuid,
    pub switch: SwitchId,
    pub entity: MonitoredEntity,
    /// Ingress port the drop rule is anchored to.
    pub in_port: PortNo,
    pub blocked_at: DateTime<Utc>,
    /// Earliest instant the entity may return to NORMAL.
    pub unblock_deadline: DateTime<Utc>,
    /// The drop rule installed for this blocking episode.
    pub rule: FlowRule,
}

/// State transition decided by one evaluation. The caller applies the
/// flow-table side effects.
#[derive(Debug, Clone)]
pub enum Transition {
    Block(MitigationRecord),
    Unblock(MitigationRecord),
}

pub struct MitigationEngine {
    config: MitigationConfig,
    records: HashMap<(SwitchId, MonitoredEntity), MitigationRecord>,
}

impl MitigationEngine {
    pub fn new(config: MitigationConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    fn breached(&self, rates: &Throughput) -> bool {
        let threshold = self.config.threshold_bytes_per_sec as f64;
        match self.config.policy {
            MitigationPolicy::IndependentRxTx => {
                rates.rx_bytes_per_sec > threshold || rates.tx_bytes_per_sec > threshold
            }
            MitigationPolicy::Combined => rates.total() > threshold,
        }
    }

    fn drop_rule_for(&self, entity: MonitoredEntity, in_port: PortNo) -> FlowRule {
        let match_fields = match entity {
            MonitoredEntity::Port(port) => FlowMatch::ingress(port),
            MonitoredEntity::Mac(mac) => FlowMatch {
                in_port: Some(in_port),
                eth_src: Some(mac),
                eth_dst: None,
            },
        };
        FlowRule::drop_matching(match_fields)
    }

    /// Feed one computed rate into the state machine and return the
    /// transition to apply, if any.
    ///
    /// A blocked entity that breaches again stays blocked as-is: no
    /// second rule, no deadline extension. Recovery requires both a rate
    /// at or below the threshold and an expired deadline.
    pub fn evaluate(
        &mut self,
        switch: SwitchId,
        entity: MonitoredEntity,
        in_port: PortNo,
        rates: &Throughput,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        let key = (switch, entity);
        let breached = self.breached(rates);

        if let Some(record) = self.records.get(&key) {
            if breached || now <= record.unblock_deadline {
                return None;
            }
            return self.release(switch, entity).map(Transition::Unblock);
        }

        if !breached {
            return None;
        }

        let record = MitigationRecord {
            id: Uuid::new_v4(),
            switch,
            entity,
            in_port,
            blocked_at: now,
            unblock_deadline: now + Duration::seconds(self.config.cooldown_seconds as i64),
            rule: self.drop_rule_for(entity, in_port),
        };
        self.records.insert(key, record.clone());
        Some(Transition::Block(record))
    }

    /// Remove the record for an entity, returning the rule to delete.
    /// Asking to release an entity that is not blocked is a logged no-op.
    pub fn release(
        &mut self,
        switch: SwitchId,
        entity: MonitoredEntity,
    ) -> Option<MitigationRecord> {
        let record = self.records.remove(&(switch, entity));
        if record.is_none() {
            warn!(
                "no drop rule recorded for {} on switch {:016x}, nothing to release",
                entity, switch
            );
        }
        record
    }

    pub fn is_blocked(&self, switch: SwitchId, entity: MonitoredEntity) -> bool {
        self.records.contains_key(&(switch, entity))
    }

    pub fn blocked_count(&self) -> usize {
        self.records.len()
    }

    /// Drop all records for a disconnected switch. Its flow table went
    /// away with it, so there are no rules left to delete.
    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.records.retain(|(s, _), _| *s != switch);
    }

    pub fn snapshot(&self) -> Vec<MitigationRecord> {
        let mut records: Vec<MitigationRecord> = self.records.values().cloned().collect();
        records.sort_by_key(|r| (r.switch, r.blocked_at));
        records
    }
}
