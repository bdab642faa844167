//! Configuration management for the traffic controller.
//!
//! This module handles loading application configuration from an
//! optional TOML file and environment variables, with built-in defaults
//! for every option.

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use std::env;

use crate::models::Config;

/// Load configuration from the config file and environment variables
pub fn load_config() -> Result<Config, ConfigError> {
    let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".to_string());

    let config = ConfigBuilder::builder()
        .add_source(File::with_name(&config_file).required(false))
        .add_source(Environment::default().separator("__"))
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("polling.interval_seconds", 10)?
        .set_default("mitigation.threshold_bytes_per_sec", 1_000_000i64)?
        .set_default("mitigation.cooldown_seconds", 60)?
        .set_default("mitigation.granularity", "port")?
        .set_default("mitigation.policy", "independent_rx_tx")?
        .build()?;

    config.try_deserialize()
}
