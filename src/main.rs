//! SDN Traffic Controller
//!
//! This is the main entry point for the traffic controller.
//! It initializes the controller components, spawns the event
//! dispatcher and the stats poller, and starts the status API server.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::{broadcast, mpsc};

use sdn_traffic_controller::api::{self, ApiState};
use sdn_traffic_controller::config;
use sdn_traffic_controller::core::controller::{self, Controller};
use sdn_traffic_controller::core::StatsPoller;
use sdn_traffic_controller::transport::{LoggingTransport, SwitchEvent, SwitchTransport};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting SDN traffic controller...");

    // Load configuration
    let config = config::load_config().context("Failed to load configuration")?;
    let (host, port) = (config.server.host.clone(), config.server.port);

    // Expose controller metrics
    PrometheusBuilder::new()
        .install()
        .context("Failed to install metrics recorder")?;

    // The protocol adapter publishes switch events here and consumes the
    // transport; a logging transport stands in until one is wired up.
    let transport: Arc<dyn SwitchTransport> = Arc::new(LoggingTransport);
    let (event_tx, event_rx) = mpsc::channel::<SwitchEvent>(256);
    let (shutdown_tx, _) = broadcast::channel(1);

    let controller = Arc::new(Controller::new(config.clone(), transport));

    // Event dispatcher
    tokio::spawn(controller::dispatch_events(
        controller.clone(),
        event_rx,
        shutdown_tx.subscribe(),
    ));

    // Stats poller
    let poller = StatsPoller::new(
        controller.clone(),
        Duration::from_secs(config.polling.interval_seconds),
        shutdown_tx.subscribe(),
    );
    tokio::spawn(poller.run());

    // Start status API server
    let state = web::Data::new(ApiState {
        controller: controller.clone(),
    });
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::config))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    // The HTTP server handles SIGINT; once it returns, stop the
    // background tasks without waiting on outstanding polls.
    let _ = shutdown_tx.send(());
    drop(event_tx);
    info!("shutdown complete");
    Ok(())
}
