//! Flow-table primitives shared across the controller.
//!
//! This module defines the match/priority/action triple that makes up a
//! switch flow-table entry, plus the packet-out instruction and the MAC
//! address type used throughout learning and mitigation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Datapath identifier of a switch.
pub type SwitchId = u64;

/// Switch port number.
pub type PortNo = u32;

/// Priority of the table-miss rule.
pub const TABLE_MISS_PRIORITY: u16 = 0;
/// Priority of learned unicast forwarding rules.
pub const FORWARD_PRIORITY: u16 = 1;
/// Priority of mitigation drop rules. Must sit above every forwarding rule.
pub const DROP_PRIORITY: u16 = 100;

/// Ether-type used by link discovery probes; these frames are never learned.
pub const ETH_TYPE_LLDP: u16 = 0x88cc;

/// Errors that can occur when parsing a MAC address
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct ParseMacError(pub String);

/// A 48-bit Ethernet address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| ParseMacError(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ParseMacError(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = ParseMacError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Match predicate of a flow rule. All fields unset means match-all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_src: Option<MacAddr>,
    pub eth_dst: Option<MacAddr>,
}

impl FlowMatch {
    /// Match-all predicate, used by the table-miss rule.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match on ingress port only.
    pub fn ingress(port: PortNo) -> Self {
        Self {
            in_port: Some(port),
            ..Self::default()
        }
    }
}

/// Action applied to frames hitting a rule. A rule with an empty action
/// list drops matching frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    /// Forward out of a specific port.
    Output(PortNo),
    /// Punt the whole frame to the controller, unbuffered.
    ToController,
}

/// A switch flow-table entry as issued by this controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowRule {
    pub match_fields: FlowMatch,
    pub priority: u16,
    pub actions: Vec<FlowAction>,
    /// Buffered frame released by the switch when the rule is installed.
    pub buffer_id: Option<u32>,
}

impl FlowRule {
    /// The lowest-priority catch-all that punts unmatched frames to the
    /// controller. Installed once per switch on connect.
    pub fn table_miss() -> Self {
        Self {
            match_fields: FlowMatch::any(),
            priority: TABLE_MISS_PRIORITY,
            actions: vec![FlowAction::ToController],
            buffer_id: None,
        }
    }

    /// Unicast forwarding rule for a learned (ingress, src, dst) flow.
    pub fn unicast(
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
        out_port: PortNo,
        buffer_id: Option<u32>,
    ) -> Self {
        Self {
            match_fields: FlowMatch {
                in_port: Some(in_port),
                eth_src: Some(src),
                eth_dst: Some(dst),
            },
            priority: FORWARD_PRIORITY,
            actions: vec![FlowAction::Output(out_port)],
            buffer_id,
        }
    }

    /// High-priority drop rule for a mitigated port or host.
    pub fn drop_matching(match_fields: FlowMatch) -> Self {
        Self {
            match_fields,
            priority: DROP_PRIORITY,
            actions: Vec::new(),
            buffer_id: None,
        }
    }

    pub fn is_drop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Destination of a packet-out instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPort {
    Port(PortNo),
    Flood,
}

/// Instruction to emit a frame from the controller through a switch.
///
/// Carries either a buffered-frame reference or the raw payload, never
/// both.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketOut {
    pub in_port: PortNo,
    pub out: OutputPort,
    pub buffer_id: Option<u32>,
    pub payload: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_addr_roundtrip() {
        let mac: MacAddr = "00:1b:44:11:3a:b7".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x1b, 0x44, 0x11, 0x3a, 0xb7]);
        assert_eq!(mac.to_string(), "00:1b:44:11:3a:b7");
    }

    #[test]
    fn mac_addr_rejects_malformed_input() {
        assert!("00:1b:44".parse::<MacAddr>().is_err());
        assert!("00:1b:44:11:3a:b7:ff".parse::<MacAddr>().is_err());
        assert!("zz:1b:44:11:3a:b7".parse::<MacAddr>().is_err());
    }

    #[test]
    fn table_miss_rule_shape() {
        let rule = FlowRule::table_miss();
        assert_eq!(rule.match_fields, FlowMatch::any());
        assert_eq!(rule.priority, TABLE_MISS_PRIORITY);
        assert_eq!(rule.actions, vec![FlowAction::ToController]);
        assert!(!rule.is_drop());
    }

    #[test]
    fn drop_rule_has_no_actions() {
        let rule = FlowRule::drop_matching(FlowMatch::ingress(3));
        assert!(rule.is_drop());
        assert_eq!(rule.priority, DROP_PRIORITY);
        assert!(rule.priority > FORWARD_PRIORITY);
    }
}
