//! Wire codec: converts characteristic values to and from bus payloads.
//!
//! | Characteristic | Outbound | Inbound |
//! |----------------|----------|---------|
//! | `On` | style command token (`power:on`, `on`, `1`, …) | state or command "on" token → `true`, anything else → `false` |
//! | `Brightness` | `b:<n>` | `[b:]<n>` |
//! | `Hue` / `Saturation` | `h:<f>` / `s:<f>`, six decimals | `[h:]<f>` / `[s:]<f>` |
//! | temperatures | `<f>`, two decimals | `<f>` |
//! | heating/cooling state | `<n>`, clamped to `1` | `<n>`, unclamped |

use crate::characteristic::{CharacteristicKind, CharacteristicValue, ValueType};
use crate::error::{DecodeError, EncodeError};
use crate::variant::{BooleanStyle, DeviceVariant};

/// Highest heating/cooling mode the bus distinguishes (`0` off, `1` heat).
pub const MAX_HEATING_COOLING_STATE: i64 = 1;

/// Stateless encoder/decoder for one accessory's wire conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    variant: DeviceVariant,
    boolean_style: BooleanStyle,
}

impl WireCodec {
    #[must_use]
    pub fn new(variant: DeviceVariant, boolean_style: BooleanStyle) -> Self {
        Self {
            variant,
            boolean_style,
        }
    }

    #[must_use]
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// Encode `value` for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnsupportedKind`] when the variant does not
    /// carry `kind`, [`EncodeError::TypeMismatch`] when `value` is not of the
    /// kind's native type and [`EncodeError::Negative`] for a negative
    /// heating/cooling state.
    pub fn encode(
        &self,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<Vec<u8>, EncodeError> {
        if !self.variant.carries(kind) {
            return Err(EncodeError::UnsupportedKind {
                variant: self.variant,
                kind,
            });
        }
        let mismatch = || EncodeError::TypeMismatch {
            kind,
            expected: kind.value_type(),
        };

        let text = match kind {
            CharacteristicKind::On => {
                let on = value.as_bool().ok_or_else(mismatch)?;
                self.boolean_style.command_token(on).to_string()
            }
            CharacteristicKind::Brightness => {
                format!("b:{}", value.as_int().ok_or_else(mismatch)?)
            }
            CharacteristicKind::Hue => format!("h:{:.6}", value.as_float().ok_or_else(mismatch)?),
            CharacteristicKind::Saturation => {
                format!("s:{:.6}", value.as_float().ok_or_else(mismatch)?)
            }
            CharacteristicKind::TargetTemperature | CharacteristicKind::CurrentTemperature => {
                format!("{:.2}", value.as_float().ok_or_else(mismatch)?)
            }
            CharacteristicKind::TargetHeatingCoolingState
            | CharacteristicKind::CurrentHeatingCoolingState => {
                let mode = value.as_int().ok_or_else(mismatch)?;
                if mode < 0 {
                    return Err(EncodeError::Negative { kind, value: mode });
                }
                mode.min(MAX_HEATING_COOLING_STATE).to_string()
            }
        };
        Ok(text.into_bytes())
    }

    /// Decode `payload` for `kind`.
    ///
    /// `On` never fails: an unrecognised payload means "off".
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnsupportedKind`] when the variant does not
    /// carry `kind` and [`DecodeError::Malformed`] when a numeric payload is
    /// not valid UTF-8, does not parse, or is not finite.
    pub fn decode(
        &self,
        kind: CharacteristicKind,
        payload: &[u8],
    ) -> Result<CharacteristicValue, DecodeError> {
        if !self.variant.carries(kind) {
            return Err(DecodeError::UnsupportedKind {
                variant: self.variant,
                kind,
            });
        }
        if kind.value_type() == ValueType::Bool {
            return Ok(CharacteristicValue::Bool(self.boolean_style.is_on(payload)));
        }

        let malformed = || DecodeError::Malformed {
            kind,
            payload: String::from_utf8_lossy(payload).into_owned(),
        };
        let text = std::str::from_utf8(payload).map_err(|_| malformed())?;
        let text = prefix(kind)
            .and_then(|prefix| text.strip_prefix(prefix))
            .unwrap_or(text);

        if kind.value_type() == ValueType::Int {
            return text
                .parse::<i64>()
                .map(CharacteristicValue::Int)
                .map_err(|_| malformed());
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(CharacteristicValue::Float(value)),
            _ => Err(malformed()),
        }
    }
}

fn prefix(kind: CharacteristicKind) -> Option<&'static str> {
    match kind {
        CharacteristicKind::Brightness => Some("b:"),
        CharacteristicKind::Hue => Some("h:"),
        CharacteristicKind::Saturation => Some("s:"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: WireCodec = WireCodec {
        variant: DeviceVariant::Light,
        boolean_style: BooleanStyle::Power,
    };
    const THERMOSTAT: WireCodec = WireCodec {
        variant: DeviceVariant::ThermostatControllable,
        boolean_style: BooleanStyle::Power,
    };

    fn encoded(codec: WireCodec, kind: CharacteristicKind, value: CharacteristicValue) -> String {
        String::from_utf8(codec.encode(kind, value).unwrap()).unwrap()
    }

    #[test]
    fn should_roundtrip_booleans_for_every_style() {
        for style in [BooleanStyle::Power, BooleanStyle::Plain, BooleanStyle::Numeric] {
            for variant in [DeviceVariant::Light, DeviceVariant::Switch] {
                let codec = WireCodec::new(variant, style);
                for value in [true, false] {
                    let wire = codec
                        .encode(CharacteristicKind::On, CharacteristicValue::Bool(value))
                        .unwrap();
                    let back = codec.decode(CharacteristicKind::On, &wire).unwrap();
                    assert_eq!(back, CharacteristicValue::Bool(value), "{style:?} {variant}");
                }
            }
        }
    }

    #[test]
    fn should_encode_light_power_commands() {
        assert_eq!(
            encoded(LIGHT, CharacteristicKind::On, CharacteristicValue::Bool(true)),
            "power:on"
        );
        assert_eq!(
            encoded(LIGHT, CharacteristicKind::On, CharacteristicValue::Bool(false)),
            "power:off"
        );
    }

    #[test]
    fn should_encode_numeric_switch_tokens() {
        let codec = WireCodec::new(DeviceVariant::Switch, BooleanStyle::Numeric);
        assert_eq!(
            encoded(codec, CharacteristicKind::On, CharacteristicValue::Bool(true)),
            "1"
        );
    }

    #[test]
    fn should_decode_unknown_boolean_payload_as_off() {
        let value = LIGHT.decode(CharacteristicKind::On, b"maybe").unwrap();
        assert_eq!(value, CharacteristicValue::Bool(false));
        let value = LIGHT.decode(CharacteristicKind::On, &[0xff, 0xfe]).unwrap();
        assert_eq!(value, CharacteristicValue::Bool(false));
    }

    #[test]
    fn should_encode_prefixed_light_values() {
        assert_eq!(
            encoded(LIGHT, CharacteristicKind::Brightness, CharacteristicValue::Int(42)),
            "b:42"
        );
        assert_eq!(
            encoded(LIGHT, CharacteristicKind::Hue, CharacteristicValue::Float(120.5)),
            "h:120.500000"
        );
        assert_eq!(
            encoded(LIGHT, CharacteristicKind::Saturation, CharacteristicValue::Float(33.0)),
            "s:33.000000"
        );
    }

    #[test]
    fn should_roundtrip_brightness() {
        let wire = LIGHT
            .encode(CharacteristicKind::Brightness, CharacteristicValue::Int(73))
            .unwrap();
        let value = LIGHT.decode(CharacteristicKind::Brightness, &wire).unwrap();
        assert_eq!(value, CharacteristicValue::Int(73));
    }

    #[test]
    fn should_roundtrip_hue_within_six_decimals() {
        let wire = LIGHT
            .encode(CharacteristicKind::Hue, CharacteristicValue::Float(359.123_456))
            .unwrap();
        let value = LIGHT.decode(CharacteristicKind::Hue, &wire).unwrap();
        let hue = value.as_float().unwrap();
        assert!((hue - 359.123_456).abs() < 1e-6);
    }

    #[test]
    fn should_decode_unprefixed_brightness() {
        let value = LIGHT.decode(CharacteristicKind::Brightness, b"12").unwrap();
        assert_eq!(value, CharacteristicValue::Int(12));
    }

    #[test]
    fn should_reject_malformed_brightness() {
        let result = LIGHT.decode(CharacteristicKind::Brightness, b"b:bright");
        assert_eq!(
            result,
            Err(DecodeError::Malformed {
                kind: CharacteristicKind::Brightness,
                payload: "b:bright".to_string(),
            })
        );
    }

    #[test]
    fn should_encode_target_temperature_with_two_decimals() {
        assert_eq!(
            encoded(
                THERMOSTAT,
                CharacteristicKind::TargetTemperature,
                CharacteristicValue::Float(22.5)
            ),
            "22.50"
        );
    }

    #[test]
    fn should_roundtrip_target_temperature_within_two_decimals() {
        for celsius in [-20.0, 0.0, 18.25, 22.5, 39.99] {
            let wire = THERMOSTAT
                .encode(
                    CharacteristicKind::TargetTemperature,
                    CharacteristicValue::Float(celsius),
                )
                .unwrap();
            let value = THERMOSTAT
                .decode(CharacteristicKind::TargetTemperature, &wire)
                .unwrap();
            assert_eq!(value, CharacteristicValue::Float(celsius));
        }
    }

    #[test]
    fn should_decode_target_temperature_payload() {
        let value = THERMOSTAT
            .decode(CharacteristicKind::TargetTemperature, b"22.50")
            .unwrap();
        assert_eq!(value, CharacteristicValue::Float(22.5));
    }

    #[test]
    fn should_reject_non_finite_temperature() {
        let result = THERMOSTAT.decode(CharacteristicKind::CurrentTemperature, b"NaN");
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn should_clamp_heating_cooling_state_on_encode() {
        let two = THERMOSTAT
            .encode(
                CharacteristicKind::TargetHeatingCoolingState,
                CharacteristicValue::Int(2),
            )
            .unwrap();
        let one = THERMOSTAT
            .encode(
                CharacteristicKind::TargetHeatingCoolingState,
                CharacteristicValue::Int(1),
            )
            .unwrap();
        assert_eq!(two, one);
        assert_eq!(two, b"1");
    }

    #[test]
    fn should_not_clamp_heating_cooling_state_on_decode() {
        let value = THERMOSTAT
            .decode(CharacteristicKind::CurrentHeatingCoolingState, b"3")
            .unwrap();
        assert_eq!(value, CharacteristicValue::Int(3));
    }

    #[test]
    fn should_reject_negative_heating_cooling_state() {
        let result = THERMOSTAT.encode(
            CharacteristicKind::TargetHeatingCoolingState,
            CharacteristicValue::Int(-1),
        );
        assert!(matches!(result, Err(EncodeError::Negative { value: -1, .. })));
    }

    #[test]
    fn should_reject_value_of_wrong_type() {
        let result = LIGHT.encode(CharacteristicKind::Brightness, CharacteristicValue::Bool(true));
        assert_eq!(
            result,
            Err(EncodeError::TypeMismatch {
                kind: CharacteristicKind::Brightness,
                expected: ValueType::Int,
            })
        );
    }

    #[test]
    fn should_reject_kind_foreign_to_variant() {
        let sensor = WireCodec::new(DeviceVariant::TemperatureSensorOnly, BooleanStyle::Power);
        let result = sensor.decode(CharacteristicKind::TargetTemperature, b"21.00");
        assert!(matches!(result, Err(DecodeError::UnsupportedKind { .. })));
        let result = LIGHT.encode(
            CharacteristicKind::TargetTemperature,
            CharacteristicValue::Float(21.0),
        );
        assert!(matches!(result, Err(EncodeError::UnsupportedKind { .. })));
    }
}
