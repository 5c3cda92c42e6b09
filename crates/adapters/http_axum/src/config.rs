//! Controller surface configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Listener, pairing and storage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Pairing PIN controllers must present on writes, eight digits.
    pub pin: String,
    /// Directory holding the bridge's persistent state.
    pub storage_path: PathBuf,
}

impl ServerConfig {
    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 51826,
            pin: "00102003".to_string(),
            storage_path: PathBuf::from("./db"),
        }
    }
}
