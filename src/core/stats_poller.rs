//! Periodic port-statistics polling.
//!
//! On every tick the poller asks each registered switch for its port
//! counters. Replies come back through the event stream on their own
//! schedule; a slow or missing reply just means no update that tick.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::core::controller::Controller;

pub struct StatsPoller {
    controller: Arc<Controller>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl StatsPoller {
    pub fn new(
        controller: Arc<Controller>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            controller,
            interval,
            shutdown,
        }
    }

    /// Poll until shutdown. Ticks that overrun the interval are not
    /// replayed; stats requests are idempotent reads, so skipping a
    /// backlog loses nothing.
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_once(),
                _ = self.shutdown.recv() => {
                    info!("stats poller stopping");
                    break;
                }
            }
        }
    }

    fn poll_once(&self) {
        let switches = self.controller.switch_ids();
        debug!("requesting port stats from {} switch(es)", switches.len());
        for switch in switches {
            self.controller.mutator().request_port_stats(switch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use crate::transport::{MockSwitchTransport, SwitchEvent};

    fn controller(transport: MockSwitchTransport) -> Arc<Controller> {
        Arc::new(Controller::new(Config::default(), Arc::new(transport)))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_every_registered_switch_each_tick() {
        let mut transport = MockSwitchTransport::new();
        transport.expect_send_flow_install().returning(|_, _| Ok(()));
        transport
            .expect_send_stats_request()
            .times(4)
            .returning(|_| Ok(()));

        let controller = controller(transport);
        controller.handle_event(SwitchEvent::Connected { switch: 1 });
        controller.handle_event(SwitchEvent::Connected { switch: 2 });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let poller = StatsPoller::new(controller, Duration::from_secs(10), shutdown_rx);
        let handle = tokio::spawn(poller.run());

        // First tick fires as soon as the poller runs, the second after
        // one interval.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_poller() {
        let mut transport = MockSwitchTransport::new();
        transport.expect_send_stats_request().returning(|_| Ok(()));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let poller = StatsPoller::new(controller(transport), Duration::from_secs(10), shutdown_rx);
        let handle = tokio::spawn(poller.run());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
