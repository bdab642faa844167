//! Boundary to the switch protocol collaborator.
//!
//! Wire encoding, connection management and event demultiplexing live in
//! an external protocol library; the controller only sees the
//! [`SwitchTransport`] send primitives and the [`SwitchEvent`] stream an
//! adapter feeds into it.

use log::debug;
use thiserror::Error;

use crate::core::flow::{FlowMatch, FlowRule, PacketOut, PortNo, SwitchId};
use crate::core::forwarding::ObservedFrame;

/// Errors that can occur when handing a message to the transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("switch {0:016x} is not connected")]
    NotConnected(SwitchId),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound primitives the controller needs from the protocol layer.
///
/// Every send is fire-and-forget: implementations enqueue the message
/// and return; the controller never waits for a switch-side
/// acknowledgement.
#[cfg_attr(test, mockall::automock)]
pub trait SwitchTransport: Send + Sync {
    fn send_flow_install(&self, switch: SwitchId, rule: &FlowRule) -> Result<(), TransportError>;

    /// Delete flow entries matching `match_fields`. With a priority the
    /// delete is exact; without one it removes every entry at least as
    /// specific as the match, across priorities.
    fn send_flow_delete(
        &self,
        switch: SwitchId,
        match_fields: &FlowMatch,
        priority: Option<u16>,
    ) -> Result<(), TransportError>;

    fn send_packet_out(&self, switch: SwitchId, packet: &PacketOut) -> Result<(), TransportError>;

    /// Request cumulative counters for every port of the switch.
    fn send_stats_request(&self, switch: SwitchId) -> Result<(), TransportError>;
}

/// Per-port cumulative counters carried by a stats reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStat {
    pub port: PortNo,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Inbound notifications delivered by the protocol adapter.
#[derive(Debug, Clone)]
pub enum SwitchEvent {
    Connected { switch: SwitchId },
    Disconnected { switch: SwitchId },
    FrameObserved(ObservedFrame),
    StatsReply { switch: SwitchId, ports: Vec<PortStat> },
}

/// Transport that logs every send and delivers nothing. Backs the binary
/// until a protocol adapter is wired in; tests use mocks instead.
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl SwitchTransport for LoggingTransport {
    fn send_flow_install(&self, switch: SwitchId, rule: &FlowRule) -> Result<(), TransportError> {
        debug!("flow install -> switch {:016x}: {:?}", switch, rule);
        Ok(())
    }

    fn send_flow_delete(
        &self,
        switch: SwitchId,
        match_fields: &FlowMatch,
        priority: Option<u16>,
    ) -> Result<(), TransportError> {
        debug!(
            "flow delete -> switch {:016x}: {:?} priority {:?}",
            switch, match_fields, priority
        );
        Ok(())
    }

    fn send_packet_out(&self, switch: SwitchId, packet: &PacketOut) -> Result<(), TransportError> {
        debug!(
            "packet out -> switch {:016x}: in_port {} to {:?}",
            switch, packet.in_port, packet.out
        );
        Ok(())
    }

    fn send_stats_request(&self, switch: SwitchId) -> Result<(), TransportError> {
        debug!("port stats request -> switch {:016x}", switch);
        Ok(())
    }
}
