//! Device variants and the per-variant wire conventions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::characteristic::CharacteristicKind;

/// The kind of accessory a binding drives. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceVariant {
    Light,
    Switch,
    ThermostatControllable,
    TemperatureSensorOnly,
}

impl DeviceVariant {
    /// Characteristics an accessory of this variant carries.
    #[must_use]
    pub fn characteristics(self) -> &'static [CharacteristicKind] {
        use CharacteristicKind as K;
        match self {
            Self::Light => &[K::On, K::Brightness, K::Hue, K::Saturation],
            Self::Switch => &[K::On],
            Self::ThermostatControllable => &[
                K::TargetTemperature,
                K::TargetHeatingCoolingState,
                K::CurrentTemperature,
                K::CurrentHeatingCoolingState,
            ],
            Self::TemperatureSensorOnly => &[K::CurrentTemperature],
        }
    }

    #[must_use]
    pub fn carries(self, kind: CharacteristicKind) -> bool {
        self.characteristics().contains(&kind)
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Switch => f.write_str("switch"),
            Self::ThermostatControllable => f.write_str("thermostat"),
            Self::TemperatureSensorOnly => f.write_str("temperature sensor"),
        }
    }
}

/// How `On` travels over the bus.
///
/// Commands go out with the command tokens; device state comes back with
/// the state tokens (`power:on` is answered by `on`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanStyle {
    /// `power:on` / `power:off`, answered by `on`.
    #[default]
    Power,
    /// `on` / `off` both ways.
    Plain,
    /// `1` / `0` both ways.
    Numeric,
}

impl BooleanStyle {
    /// Token published for `value`.
    #[must_use]
    pub fn command_token(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Power, true) => "power:on",
            (Self::Power, false) => "power:off",
            (Self::Plain, true) => "on",
            (Self::Plain, false) => "off",
            (Self::Numeric, true) => "1",
            (Self::Numeric, false) => "0",
        }
    }

    /// Token a device reports when it is on.
    #[must_use]
    pub fn state_token(self) -> &'static str {
        match self {
            Self::Power | Self::Plain => "on",
            Self::Numeric => "1",
        }
    }

    /// Whether `payload` means "on". Any other payload means "off".
    #[must_use]
    pub fn is_on(self, payload: &[u8]) -> bool {
        payload == self.state_token().as_bytes() || payload == self.command_token(true).as_bytes()
    }
}

/// Separator between the light prefix and its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicSeparator {
    /// `light_<id>/…`
    #[default]
    Underscore,
    /// `light/<id>/…`
    Slash,
}

impl TopicSeparator {
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Underscore => '_',
            Self::Slash => '/',
        }
    }
}
