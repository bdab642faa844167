//! Throughput computation from cumulative port counters.
//!
//! The tracker keeps exactly one previous sample per (switch, entity) and
//! turns consecutive samples into a byte rate. Samples that cannot yield
//! a trustworthy rate (first observation, non-positive interval, counter
//! rollback after a switch restart) produce no data instead of a bogus
//! value; the new sample still replaces the stored one so the next
//! interval measures cleanly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::flow::{MacAddr, PortNo, SwitchId};

/// The unit of monitoring and mitigation: a switch port, or the host
/// learned behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoredEntity {
    Port(PortNo),
    Mac(MacAddr),
}

impl std::fmt::Display for MonitoredEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitoredEntity::Port(port) => write!(f, "port {}", port),
            MonitoredEntity::Mac(mac) => write!(f, "mac {}", mac),
        }
    }
}

/// Cumulative counters read from one port at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub observed_at: DateTime<Utc>,
}

/// Computed byte rates for one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Throughput {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

impl Throughput {
    pub fn total(&self) -> f64 {
        self.rx_bytes_per_sec + self.tx_bytes_per_sec
    }
}

#[derive(Debug, Default)]
pub struct ThroughputTracker {
    prev: HashMap<(SwitchId, MonitoredEntity), PortSample>,
}

impl ThroughputTracker {
    /// Store `sample` and, when a prior sample exists and the pair is
    /// sound, return the rate over the elapsed interval.
    pub fn record(
        &mut self,
        switch: SwitchId,
        entity: MonitoredEntity,
        sample: PortSample,
    ) -> Option<Throughput> {
        let prev = self.prev.insert((switch, entity), sample)?;

        let interval = (sample.observed_at - prev.observed_at).num_milliseconds() as f64 / 1000.0;
        if interval <= 0.0 {
            return None;
        }
        // Counter rollback: the switch restarted or the counters reset.
        if sample.rx_bytes < prev.rx_bytes || sample.tx_bytes < prev.tx_bytes {
            return None;
        }

        Some(Throughput {
            rx_bytes_per_sec: (sample.rx_bytes - prev.rx_bytes) as f64 / interval,
            tx_bytes_per_sec: (sample.tx_bytes - prev.tx_bytes) as f64 / interval,
        })
    }

    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.prev.retain(|(s, _), _| *s != switch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs as i64)
    }

    fn sample(rx: u64, tx: u64, secs: u32) -> PortSample {
        PortSample {
            rx_bytes: rx,
            tx_bytes: tx,
            observed_at: at(secs),
        }
    }

    const ENTITY: MonitoredEntity = MonitoredEntity::Port(1);

    #[test]
    fn first_sample_yields_no_data() {
        let mut tracker = ThroughputTracker::default();
        assert_eq!(tracker.record(1, ENTITY, sample(1000, 0, 0)), None);
    }

    #[test]
    fn computes_rate_over_interval() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(0, 0, 0));
        let rates = tracker.record(1, ENTITY, sample(20_000_000, 5_000_000, 10)).unwrap();
        assert_eq!(rates.rx_bytes_per_sec, 2_000_000.0);
        assert_eq!(rates.tx_bytes_per_sec, 500_000.0);
        assert_eq!(rates.total(), 2_500_000.0);
    }

    #[test]
    fn rates_are_never_negative_for_monotonic_counters() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(500, 500, 0));
        let rates = tracker.record(1, ENTITY, sample(500, 500, 10)).unwrap();
        assert_eq!(rates.rx_bytes_per_sec, 0.0);
        assert_eq!(rates.tx_bytes_per_sec, 0.0);
    }

    #[test]
    fn zero_interval_yields_no_data() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(0, 0, 0));
        assert_eq!(tracker.record(1, ENTITY, sample(1000, 1000, 0)), None);
    }

    #[test]
    fn backwards_clock_yields_no_data() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(0, 0, 10));
        let earlier = PortSample {
            rx_bytes: 1000,
            tx_bytes: 1000,
            observed_at: at(0),
        };
        assert_eq!(tracker.record(1, ENTITY, earlier), None);
    }

    #[test]
    fn counter_rollback_yields_no_data() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(1_000_000, 1_000_000, 0));
        assert_eq!(tracker.record(1, ENTITY, sample(100, 100, 10)), None);
    }

    #[test]
    fn interval_after_rollback_measures_cleanly() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(1_000_000, 0, 0));
        tracker.record(1, ENTITY, sample(100, 0, 10));
        let rates = tracker.record(1, ENTITY, sample(1100, 0, 20)).unwrap();
        assert_eq!(rates.rx_bytes_per_sec, 100.0);
    }

    #[test]
    fn entities_are_tracked_independently() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, MonitoredEntity::Port(1), sample(0, 0, 0));
        assert_eq!(tracker.record(1, MonitoredEntity::Port(2), sample(500, 0, 10)), None);
        assert_eq!(tracker.record(2, MonitoredEntity::Port(1), sample(500, 0, 10)), None);
    }

    #[test]
    fn remove_switch_discards_samples() {
        let mut tracker = ThroughputTracker::default();
        tracker.record(1, ENTITY, sample(0, 0, 0));
        tracker.remove_switch(1);
        assert_eq!(tracker.record(1, ENTITY, sample(1000, 0, 10)), None);
    }
}
