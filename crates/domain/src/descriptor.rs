//! Accessory descriptors: the validated, immutable description of one
//! configured accessory.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::variant::{BooleanStyle, DeviceVariant, TopicSeparator};

/// Where a switch exchanges its messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchTopics {
    /// `switch_<id>/control` and `switch_<id>/state`.
    MachineId,
    /// Topics given verbatim by the configuration.
    Explicit {
        control_topic: String,
        state_topic: String,
    },
}

/// Temperature bounds advertised to controllers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            min: -20.0,
            max: 40.0,
            step: 1.0,
        }
    }
}

impl TemperatureRange {
    /// Clamp `value` into `[min, max]`.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max && self.step > 0.0
    }
}

/// Variant-specific parameters of an accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccessoryKind {
    Light {
        separator: TopicSeparator,
    },
    Switch {
        topics: SwitchTopics,
        boolean_style: BooleanStyle,
    },
    Thermostat {
        controllable: bool,
        range: TemperatureRange,
    },
}

impl AccessoryKind {
    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        match self {
            Self::Light { .. } => DeviceVariant::Light,
            Self::Switch { .. } => DeviceVariant::Switch,
            Self::Thermostat {
                controllable: true, ..
            } => DeviceVariant::ThermostatControllable,
            Self::Thermostat {
                controllable: false,
                ..
            } => DeviceVariant::TemperatureSensorOnly,
        }
    }

    /// Wire style of the `On` characteristic. Lights always use
    /// [`BooleanStyle::Power`]; thermostats carry no boolean.
    #[must_use]
    pub fn boolean_style(&self) -> BooleanStyle {
        match self {
            Self::Switch { boolean_style, .. } => *boolean_style,
            Self::Light { .. } | Self::Thermostat { .. } => BooleanStyle::Power,
        }
    }

    /// Temperature range, for thermostats.
    #[must_use]
    pub fn range(&self) -> Option<TemperatureRange> {
        match self {
            Self::Thermostat { range, .. } => Some(*range),
            Self::Light { .. } | Self::Switch { .. } => None,
        }
    }
}

/// A configured accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryDescriptor {
    /// Identifier used to derive topic names.
    pub identifier: String,
    /// Display name shown to controllers.
    pub name: String,
    pub manufacturer: String,
    pub kind: AccessoryKind,
}

impl AccessoryDescriptor {
    /// Create a builder for constructing an [`AccessoryDescriptor`].
    #[must_use]
    pub fn builder() -> AccessoryDescriptorBuilder {
        AccessoryDescriptorBuilder::default()
    }

    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.kind.variant()
    }

    /// Check descriptor invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the identifier is empty or unusable in
    /// a topic, the name is empty, an explicit topic is empty, or a
    /// thermostat range is inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier.is_empty() {
            return Err(ConfigError::EmptyIdentifier);
        }
        if self
            .identifier
            .chars()
            .any(|c| matches!(c, '/' | '+' | '#') || c.is_whitespace())
        {
            return Err(ConfigError::InvalidIdentifier(self.identifier.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                identifier: self.identifier.clone(),
            });
        }
        match &self.kind {
            AccessoryKind::Switch {
                topics:
                    SwitchTopics::Explicit {
                        control_topic,
                        state_topic,
                    },
                ..
            } => {
                for (field, topic) in [("control_topic", control_topic), ("state_topic", state_topic)] {
                    if topic.is_empty() {
                        return Err(ConfigError::EmptyTopic {
                            identifier: self.identifier.clone(),
                            field,
                        });
                    }
                }
            }
            AccessoryKind::Thermostat { range, .. } if !range.is_valid() => {
                return Err(ConfigError::InvalidRange {
                    identifier: self.identifier.clone(),
                    min: range.min,
                    max: range.max,
                    step: range.step,
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Step-by-step builder for [`AccessoryDescriptor`].
#[derive(Debug, Default)]
pub struct AccessoryDescriptorBuilder {
    identifier: Option<String>,
    name: Option<String>,
    manufacturer: Option<String>,
    kind: Option<AccessoryKind>,
}

impl AccessoryDescriptorBuilder {
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: AccessoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Consume the builder, validate, and return an [`AccessoryDescriptor`].
    ///
    /// The manufacturer defaults to `"hkbridge"`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the kind is missing or
    /// [`AccessoryDescriptor::validate`] fails.
    pub fn build(self) -> Result<AccessoryDescriptor, ConfigError> {
        let identifier = self.identifier.unwrap_or_default();
        let kind = self.kind.ok_or_else(|| ConfigError::MissingKind {
            identifier: identifier.clone(),
        })?;
        let descriptor = AccessoryDescriptor {
            identifier,
            name: self.name.unwrap_or_default(),
            manufacturer: self.manufacturer.unwrap_or_else(|| "hkbridge".to_string()),
            kind,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
