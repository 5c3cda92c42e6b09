//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `hkbridge.toml` from the working directory, or the file named by
//! `HKBRIDGE_CONFIG`. Every section has defaults except the accessory list,
//! which must name at least one accessory. Environment variables take
//! precedence over file values.

use hkbridge_adapter_http_axum::ServerConfig;
use hkbridge_adapter_mqtt::MqttConfig;
use hkbridge_domain::descriptor::{
    AccessoryDescriptor, AccessoryKind, SwitchTopics, TemperatureRange,
};
use hkbridge_domain::variant::{BooleanStyle, TopicSeparator};
use serde::Deserialize;

const DEFAULT_PATH: &str = "hkbridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Manufacturer reported for accessories that do not set their own.
    pub manufacturer: Option<String>,
    /// Broker connection.
    pub broker: MqttConfig,
    /// Controller surface.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Bridged accessories, in the order they are advertised.
    pub accessories: Vec<AccessoryConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One `[[accessories]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessoryConfig {
    pub id: String,
    pub name: String,
    pub manufacturer: Option<String>,
    #[serde(flatten)]
    pub kind: KindConfig,
}

/// Variant-specific keys, selected by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindConfig {
    Light {
        #[serde(default)]
        separator: TopicSeparator,
    },
    Switch {
        /// Defaults to `power` on machine-id topics and `plain` on explicit ones.
        style: Option<BooleanStyle>,
        control_topic: Option<String>,
        state_topic: Option<String>,
    },
    Thermostat {
        #[serde(flatten)]
        range: RangeConfig,
    },
    TemperatureSensor {
        #[serde(flatten)]
        range: RangeConfig,
    },
}

/// Temperature bounds; missing keys fall back to -20..=40 in steps of 1.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangeConfig {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl RangeConfig {
    fn resolve(self) -> TemperatureRange {
        let default = TemperatureRange::default();
        TemperatureRange {
            min: self.min.unwrap_or(default.min),
            max: self.max.unwrap_or(default.max),
            step: self.step.unwrap_or(default.step),
        }
    }
}

impl Config {
    /// Load configuration from `HKBRIDGE_CONFIG` or `hkbridge.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = std::env::var("HKBRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigFileError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigFileError::Io(err)),
        }
    }

    fn parse(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(ConfigFileError::Parse)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HKBRIDGE_BROKER_HOST") {
            self.broker.host = val;
        }
        if let Ok(val) = std::env::var("HKBRIDGE_BROKER_PORT") {
            if let Ok(port) = val.parse() {
                self.broker.port = port;
            }
        }
        if let Ok(val) = std::env::var("HKBRIDGE_PIN") {
            self.server.pin = val;
        }
        if let Ok(val) = std::env::var("HKBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigFileError> {
        if self.broker.port == 0 {
            return Err(ConfigFileError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigFileError::Validation(
                "server port must be non-zero".to_string(),
            ));
        }
        if self.server.pin.len() != 8 || !self.server.pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigFileError::Validation(
                "pin must be exactly eight digits".to_string(),
            ));
        }
        if self.accessories.is_empty() {
            return Err(ConfigFileError::Validation(
                "at least one accessory must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Turn the accessory entries into validated descriptors, in order.
    ///
    /// # Errors
    ///
    /// Returns the first entry that does not describe a valid accessory.
    pub fn descriptors(&self) -> Result<Vec<AccessoryDescriptor>, ConfigFileError> {
        self.accessories
            .iter()
            .map(|entry| entry.descriptor(self.manufacturer.as_deref()))
            .collect()
    }
}

impl AccessoryConfig {
    fn descriptor(&self, fallback: Option<&str>) -> Result<AccessoryDescriptor, ConfigFileError> {
        let kind = match &self.kind {
            KindConfig::Light { separator } => AccessoryKind::Light {
                separator: *separator,
            },
            KindConfig::Switch {
                style,
                control_topic,
                state_topic,
            } => {
                let topics = self.switch_topics(control_topic.as_ref(), state_topic.as_ref())?;
                let boolean_style = style.unwrap_or(match topics {
                    SwitchTopics::MachineId => BooleanStyle::Power,
                    SwitchTopics::Explicit { .. } => BooleanStyle::Plain,
                });
                AccessoryKind::Switch {
                    topics,
                    boolean_style,
                }
            }
            KindConfig::Thermostat { range } => AccessoryKind::Thermostat {
                controllable: true,
                range: range.resolve(),
            },
            KindConfig::TemperatureSensor { range } => AccessoryKind::Thermostat {
                controllable: false,
                range: range.resolve(),
            },
        };

        let mut builder = AccessoryDescriptor::builder()
            .identifier(&self.id)
            .name(&self.name)
            .kind(kind);
        if let Some(manufacturer) = self.manufacturer.as_deref().or(fallback) {
            builder = builder.manufacturer(manufacturer);
        }
        Ok(builder.build()?)
    }

    fn switch_topics(
        &self,
        control_topic: Option<&String>,
        state_topic: Option<&String>,
    ) -> Result<SwitchTopics, ConfigFileError> {
        match (control_topic, state_topic) {
            (None, None) => Ok(SwitchTopics::MachineId),
            (Some(control), Some(state)) => Ok(SwitchTopics::Explicit {
                control_topic: control.clone(),
                state_topic: state.clone(),
            }),
            _ => Err(ConfigFileError::Validation(format!(
                "switch {:?} must set both control_topic and state_topic, or neither",
                self.id
            ))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hkbridged=info,hkbridge=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// An accessory entry does not describe a valid accessory.
    #[error("invalid accessory")]
    Descriptor(#[from] hkbridge_domain::error::ConfigError),
}
