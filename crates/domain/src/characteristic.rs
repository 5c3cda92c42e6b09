//! Characteristics: the addressable properties of an accessory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One controllable or observable property of an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacteristicKind {
    On,
    Brightness,
    Hue,
    Saturation,
    TargetTemperature,
    TargetHeatingCoolingState,
    CurrentTemperature,
    CurrentHeatingCoolingState,
}

impl CharacteristicKind {
    /// Every known kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::On,
        Self::Brightness,
        Self::Hue,
        Self::Saturation,
        Self::TargetTemperature,
        Self::TargetHeatingCoolingState,
        Self::CurrentTemperature,
        Self::CurrentHeatingCoolingState,
    ];

    /// Native value type of this characteristic.
    #[must_use]
    pub fn value_type(self) -> ValueType {
        match self {
            Self::On => ValueType::Bool,
            Self::Brightness | Self::TargetHeatingCoolingState | Self::CurrentHeatingCoolingState => {
                ValueType::Int
            }
            Self::Hue | Self::Saturation | Self::TargetTemperature | Self::CurrentTemperature => {
                ValueType::Float
            }
        }
    }

    /// Current readings are reported by the device and never written by a
    /// controller.
    #[must_use]
    pub fn read_only(self) -> bool {
        matches!(
            self,
            Self::CurrentTemperature | Self::CurrentHeatingCoolingState
        )
    }

    /// Stable name used in logs and on the controller surface.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Brightness => "Brightness",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::TargetTemperature => "TargetTemperature",
            Self::TargetHeatingCoolingState => "TargetHeatingCoolingState",
            Self::CurrentTemperature => "CurrentTemperature",
            Self::CurrentHeatingCoolingState => "CurrentHeatingCoolingState",
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown characteristic name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown characteristic {0:?}")]
pub struct UnknownCharacteristic(pub String);

impl FromStr for CharacteristicKind {
    type Err = UnknownCharacteristic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownCharacteristic(s.to_string()))
    }
}

/// Native type of a characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
}

impl ValueType {
    /// Convert `value` into this type when the conversion is lossless.
    ///
    /// Integers widen to floats; everything else must already match.
    #[must_use]
    pub fn coerce(self, value: CharacteristicValue) -> Option<CharacteristicValue> {
        match (self, value) {
            (Self::Bool, CharacteristicValue::Bool(_))
            | (Self::Int, CharacteristicValue::Int(_))
            | (Self::Float, CharacteristicValue::Float(_)) => Some(value),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, CharacteristicValue::Int(n)) => Some(CharacteristicValue::Float(n as f64)),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("boolean"),
            Self::Int => f.write_str("integer"),
            Self::Float => f.write_str("float"),
        }
    }
}

/// A characteristic value in its native type.
///
/// Equality is exact, floats included: the echo suppression of a binding
/// relies on publishers replaying values with stable formatting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CharacteristicValue {
    #[must_use]
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => value.fmt(f),
            Self::Int(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
        }
    }
}
