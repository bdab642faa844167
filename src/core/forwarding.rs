//! Forwarding decision engine.
//!
//! Turns an observed frame into a learning-table update plus a forwarding
//! decision: unicast to a learned port (with a flow rule so the switch
//! handles the rest of the flow itself) or flood when the destination is
//! still unknown.

use log::info;

use crate::core::flow::{
    FlowRule, MacAddr, OutputPort, PacketOut, PortNo, SwitchId, ETH_TYPE_LLDP,
};
use crate::core::mac_table::MacLearningTable;

/// A frame punted to the controller by the table-miss rule.
#[derive(Debug, Clone)]
pub struct ObservedFrame {
    pub switch: SwitchId,
    pub in_port: PortNo,
    pub src: MacAddr,
    pub dst: MacAddr,
    pub ether_type: u16,
    /// Reference to the frame buffered on the switch, when it was not
    /// sent in full.
    pub buffer_id: Option<u32>,
    pub payload: Vec<u8>,
}

/// What to do with an observed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardingDecision {
    /// Destination is learned: install a flow rule and, unless the switch
    /// buffered the frame (in which case the install releases it), emit
    /// the frame explicitly.
    Unicast {
        out_port: PortNo,
        install: FlowRule,
        packet_out: Option<PacketOut>,
    },
    /// Destination unknown: flood the frame to all ports.
    Flood { packet_out: PacketOut },
}

/// Learn the source address and decide where the frame goes.
///
/// Discovery probes produce no side effects and no decision. Everything
/// else updates the learning table first, then resolves the destination.
pub fn handle_frame(
    table: &mut MacLearningTable,
    frame: &ObservedFrame,
) -> Option<ForwardingDecision> {
    if frame.ether_type == ETH_TYPE_LLDP {
        return None;
    }

    info!(
        "packet in: switch={:016x}, src={}, dst={}, in_port={}",
        frame.switch, frame.src, frame.dst, frame.in_port
    );

    table.learn(frame.switch, frame.src, frame.in_port);

    let Some(out_port) = table.lookup(frame.switch, frame.dst) else {
        return Some(ForwardingDecision::Flood {
            packet_out: packet_out_to(frame, OutputPort::Flood),
        });
    };

    let install = FlowRule::unicast(frame.in_port, frame.src, frame.dst, out_port, frame.buffer_id);
    // A buffered frame is released by the rule install itself; only an
    // unbuffered frame needs an explicit packet-out.
    let packet_out = if frame.buffer_id.is_some() {
        None
    } else {
        Some(packet_out_to(frame, OutputPort::Port(out_port)))
    };

    Some(ForwardingDecision::Unicast {
        out_port,
        install,
        packet_out,
    })
}

fn packet_out_to(frame: &ObservedFrame, out: OutputPort) -> PacketOut {
    PacketOut {
        in_port: frame.in_port,
        out,
        buffer_id: frame.buffer_id,
        payload: if frame.buffer_id.is_some() {
            None
        } else {
            Some(frame.payload.clone())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flow::{FlowAction, FORWARD_PRIORITY};

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0x00, 0x00, 0x00, 0x00, 0x00, last])
    }

    fn frame(src: u8, dst: u8, in_port: PortNo, buffer_id: Option<u32>) -> ObservedFrame {
        ObservedFrame {
            switch: 1,
            in_port,
            src: mac(src),
            dst: mac(dst),
            ether_type: 0x0800,
            buffer_id,
            payload: vec![0xde, 0xad],
        }
    }

    #[test]
    fn discovery_frames_are_ignored() {
        let mut table = MacLearningTable::default();
        let mut probe = frame(0x01, 0x02, 1, None);
        probe.ether_type = ETH_TYPE_LLDP;

        assert_eq!(handle_frame(&mut table, &probe), None);
        assert_eq!(table.lookup(1, mac(0x01)), None);
    }

    #[test]
    fn unknown_destination_floods_with_payload() {
        let mut table = MacLearningTable::default();
        let decision = handle_frame(&mut table, &frame(0x01, 0x02, 1, None)).unwrap();

        // Source was learned even though the frame flooded.
        assert_eq!(table.lookup(1, mac(0x01)), Some(1));
        match decision {
            ForwardingDecision::Flood { packet_out } => {
                assert_eq!(packet_out.out, OutputPort::Flood);
                assert_eq!(packet_out.payload.as_deref(), Some(&[0xde, 0xad][..]));
                assert_eq!(packet_out.buffer_id, None);
            }
            other => panic!("expected flood, got {:?}", other),
        }
    }

    #[test]
    fn learned_destination_installs_rule_and_emits_frame() {
        let mut table = MacLearningTable::default();
        table.learn(1, mac(0x02), 4);

        let decision = handle_frame(&mut table, &frame(0x01, 0x02, 1, None)).unwrap();
        match decision {
            ForwardingDecision::Unicast {
                out_port,
                install,
                packet_out,
            } => {
                assert_eq!(out_port, 4);
                assert_eq!(install.priority, FORWARD_PRIORITY);
                assert_eq!(install.match_fields.in_port, Some(1));
                assert_eq!(install.match_fields.eth_src, Some(mac(0x01)));
                assert_eq!(install.match_fields.eth_dst, Some(mac(0x02)));
                assert_eq!(install.actions, vec![FlowAction::Output(4)]);
                assert_eq!(install.buffer_id, None);

                let packet_out = packet_out.expect("unbuffered frame needs a packet-out");
                assert_eq!(packet_out.out, OutputPort::Port(4));
            }
            other => panic!("expected unicast, got {:?}", other),
        }
    }

    #[test]
    fn buffered_frame_is_released_by_the_install() {
        let mut table = MacLearningTable::default();
        table.learn(1, mac(0x02), 4);

        let decision = handle_frame(&mut table, &frame(0x01, 0x02, 1, Some(42))).unwrap();
        match decision {
            ForwardingDecision::Unicast {
                install, packet_out, ..
            } => {
                assert_eq!(install.buffer_id, Some(42));
                assert_eq!(packet_out, None);
            }
            other => panic!("expected unicast, got {:?}", other),
        }
    }

    #[test]
    fn flood_of_buffered_frame_references_the_buffer() {
        let mut table = MacLearningTable::default();
        let decision = handle_frame(&mut table, &frame(0x01, 0x02, 1, Some(7))).unwrap();
        match decision {
            ForwardingDecision::Flood { packet_out } => {
                assert_eq!(packet_out.buffer_id, Some(7));
                assert_eq!(packet_out.payload, None);
            }
            other => panic!("expected flood, got {:?}", other),
        }
    }
}
