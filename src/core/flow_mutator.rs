//! Flow-table mutation front end.
//!
//! Thin layer between the control logic and the transport: it shapes the
//! install/delete/packet-out messages and absorbs transport errors. A
//! failed send is logged and skipped; measurement noise and flapping
//! links must never take the control loop down.

use std::sync::Arc;

use log::warn;

use crate::core::flow::{FlowMatch, FlowRule, PacketOut, PortNo, SwitchId};
use crate::transport::SwitchTransport;

pub struct FlowMutator {
    transport: Arc<dyn SwitchTransport>,
}

impl FlowMutator {
    pub fn new(transport: Arc<dyn SwitchTransport>) -> Self {
        Self { transport }
    }

    /// Install the catch-all rule that punts unmatched frames to the
    /// controller. Sent once per switch connect.
    pub fn install_table_miss(&self, switch: SwitchId) {
        self.install(switch, &FlowRule::table_miss());
    }

    pub fn install(&self, switch: SwitchId, rule: &FlowRule) {
        if let Err(e) = self.transport.send_flow_install(switch, rule) {
            warn!(
                "flow install failed on switch {:016x} (priority {}): {}",
                switch, rule.priority, e
            );
        }
    }

    /// Remove every rule anchored to an ingress port, across priorities.
    /// Run before installing a drop rule so no overlapping forwarding
    /// entry keeps matching.
    pub fn remove_port_flows(&self, switch: SwitchId, port: PortNo) {
        if let Err(e) = self
            .transport
            .send_flow_delete(switch, &FlowMatch::ingress(port), None)
        {
            warn!(
                "flow delete for port {} failed on switch {:016x}: {}",
                port, switch, e
            );
        }
    }

    /// Remove one rule by exact match and priority.
    pub fn remove_rule(&self, switch: SwitchId, rule: &FlowRule) {
        if let Err(e) =
            self.transport
                .send_flow_delete(switch, &rule.match_fields, Some(rule.priority))
        {
            warn!(
                "flow delete failed on switch {:016x} (priority {}): {}",
                switch, rule.priority, e
            );
        }
    }

    pub fn packet_out(&self, switch: SwitchId, packet: &PacketOut) {
        if let Err(e) = self.transport.send_packet_out(switch, packet) {
            warn!("packet out failed on switch {:016x}: {}", switch, e);
        }
    }

    pub fn request_port_stats(&self, switch: SwitchId) {
        if let Err(e) = self.transport.send_stats_request(switch) {
            warn!("stats request failed on switch {:016x}: {}", switch, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flow::{FlowAction, TABLE_MISS_PRIORITY};
    use crate::transport::{MockSwitchTransport, TransportError};

    #[test]
    fn table_miss_install_is_match_all_to_controller() {
        let mut transport = MockSwitchTransport::new();
        transport
            .expect_send_flow_install()
            .withf(|switch, rule| {
                *switch == 7
                    && rule.match_fields == FlowMatch::any()
                    && rule.priority == TABLE_MISS_PRIORITY
                    && rule.actions == vec![FlowAction::ToController]
                    && rule.buffer_id.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        FlowMutator::new(Arc::new(transport)).install_table_miss(7);
    }

    #[test]
    fn conflict_purge_deletes_across_priorities() {
        let mut transport = MockSwitchTransport::new();
        transport
            .expect_send_flow_delete()
            .withf(|switch, match_fields, priority| {
                *switch == 1 && *match_fields == FlowMatch::ingress(3) && priority.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        FlowMutator::new(Arc::new(transport)).remove_port_flows(1, 3);
    }

    #[test]
    fn exact_removal_carries_rule_priority() {
        let rule = FlowRule::drop_matching(FlowMatch::ingress(3));
        let expected = rule.clone();

        let mut transport = MockSwitchTransport::new();
        transport
            .expect_send_flow_delete()
            .withf(move |switch, match_fields, priority| {
                *switch == 1
                    && *match_fields == expected.match_fields
                    && *priority == Some(expected.priority)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        FlowMutator::new(Arc::new(transport)).remove_rule(1, &rule);
    }

    #[test]
    fn transport_errors_are_swallowed() {
        let mut transport = MockSwitchTransport::new();
        transport
            .expect_send_flow_install()
            .returning(|switch, _| Err(TransportError::NotConnected(switch)));
        transport
            .expect_send_stats_request()
            .returning(|_| Err(TransportError::SendFailed("socket closed".into())));

        let mutator = FlowMutator::new(Arc::new(transport));
        mutator.install_table_miss(1);
        mutator.request_port_stats(1);
    }
}
