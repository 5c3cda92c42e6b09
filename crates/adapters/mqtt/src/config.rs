//! MQTT broker connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub host: String,
    /// MQTT broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// How long to wait for the broker to acknowledge the first connection.
    pub connect_timeout_secs: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.into())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.into())
    }

    /// Username and password, when both are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "hkbridge".to_string(),
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}
