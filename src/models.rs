use serde::{Deserialize, Serialize};

use crate::core::MitigationConfig;

/// Status API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Stats polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between port-statistics requests
    pub interval_seconds: u64,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Status API configuration
    pub server: ServerConfig,
    /// Stats polling configuration
    pub polling: PollingConfig,
    /// Mitigation configuration
    pub mitigation: MitigationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            polling: PollingConfig {
                interval_seconds: 10,
            },
            mitigation: MitigationConfig::default(),
        }
    }
}
