//! # hkbridge-adapter-accessory
//!
//! In-memory capability provider: builds the accessory objects the
//! controller surface exposes and the bindings mirror onto the bus.
//!
//! ## Provided accessories
//!
//! | Variant | Characteristics | Initial values |
//! |---------|-----------------|----------------|
//! | Light | On, Brightness, Hue, Saturation | off, 100, 0.0, 0.0 |
//! | Switch | On | off |
//! | Thermostat | current/target temperature, current/target heating-cooling state | range-clamped 0.0, 0 |
//! | Temperature sensor | current temperature | range-clamped 0.0 |
//!
//! ## Dependency rule
//!
//! Depends on `hkbridge-app` (port traits) and `hkbridge-domain` only.

mod characteristic;

use std::sync::Arc;

use hkbridge_app::ports::{Accessory, CapabilityProvider, Characteristic};
use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};
use hkbridge_domain::descriptor::{AccessoryDescriptor, AccessoryKind};
use hkbridge_domain::error::ConfigError;

pub use characteristic::MemoryCharacteristic;

/// An accessory whose characteristics live in memory.
pub struct MemoryAccessory {
    descriptor: AccessoryDescriptor,
    characteristics: Vec<Arc<MemoryCharacteristic>>,
}

impl Accessory for MemoryAccessory {
    type Characteristic = MemoryCharacteristic;

    fn descriptor(&self) -> &AccessoryDescriptor {
        &self.descriptor
    }

    fn characteristic(&self, kind: CharacteristicKind) -> Option<Arc<MemoryCharacteristic>> {
        self.characteristics
            .iter()
            .find(|characteristic| characteristic.kind() == kind)
            .cloned()
    }

    fn characteristics(&self) -> Vec<Arc<MemoryCharacteristic>> {
        self.characteristics.clone()
    }
}

/// Builds [`MemoryAccessory`] values from validated descriptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryProvider;

impl CapabilityProvider for MemoryProvider {
    type Accessory = MemoryAccessory;

    fn create_accessory(
        &self,
        descriptor: &AccessoryDescriptor,
    ) -> Result<Arc<MemoryAccessory>, ConfigError> {
        descriptor.validate()?;

        let characteristics = descriptor
            .variant()
            .characteristics()
            .iter()
            .map(|&kind| {
                let initial = initial_value(&descriptor.kind, kind);
                Arc::new(MemoryCharacteristic::new(kind, initial))
            })
            .collect();

        tracing::debug!(
            accessory = %descriptor.identifier,
            variant = %descriptor.variant(),
            "accessory created"
        );
        Ok(Arc::new(MemoryAccessory {
            descriptor: descriptor.clone(),
            characteristics,
        }))
    }
}

fn initial_value(kind: &AccessoryKind, characteristic: CharacteristicKind) -> CharacteristicValue {
    match characteristic {
        CharacteristicKind::On => CharacteristicValue::Bool(false),
        CharacteristicKind::Brightness => CharacteristicValue::Int(100),
        CharacteristicKind::Hue | CharacteristicKind::Saturation => CharacteristicValue::Float(0.0),
        CharacteristicKind::CurrentTemperature | CharacteristicKind::TargetTemperature => {
            let start = kind.range().map_or(0.0, |range| range.clamp(0.0));
            CharacteristicValue::Float(start)
        }
        CharacteristicKind::CurrentHeatingCoolingState
        | CharacteristicKind::TargetHeatingCoolingState => CharacteristicValue::Int(0),
    }
}
