//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for the HTTP shell around the dispatcher.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Log file; stderr when unset.
    pub log: Option<PathBuf>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
