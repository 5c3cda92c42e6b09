//! In-memory port stubs shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue, ValueType};
use hkbridge_domain::descriptor::{AccessoryDescriptor, AccessoryKind, TemperatureRange};
use hkbridge_domain::error::{ConfigError, PublishError, SubscribeError};
use hkbridge_domain::variant::TopicSeparator;

use crate::ports::{
    Accessory, BusTransport, CapabilityProvider, Characteristic, MessageHandler,
    RemoteUpdateHandler,
};

pub(crate) fn kitchen_light() -> AccessoryDescriptor {
    AccessoryDescriptor::builder()
        .identifier("kitchen")
        .name("Kitchen")
        .kind(AccessoryKind::Light {
            separator: TopicSeparator::Underscore,
        })
        .build()
        .unwrap()
}

pub(crate) fn living_thermostat() -> AccessoryDescriptor {
    AccessoryDescriptor::builder()
        .identifier("living")
        .name("Living Room")
        .kind(AccessoryKind::Thermostat {
            controllable: true,
            range: TemperatureRange {
                min: 10.0,
                max: 30.0,
                step: 0.5,
            },
        })
        .build()
        .unwrap()
}

/// Characteristic that records the writes made through the binding path.
pub(crate) struct StubCharacteristic {
    kind: CharacteristicKind,
    value: Mutex<CharacteristicValue>,
    binding_writes: Mutex<Vec<CharacteristicValue>>,
    handlers: Mutex<Vec<RemoteUpdateHandler>>,
}

impl StubCharacteristic {
    fn new(kind: CharacteristicKind) -> Self {
        let value = match kind.value_type() {
            ValueType::Bool => CharacteristicValue::Bool(false),
            ValueType::Int => CharacteristicValue::Int(0),
            ValueType::Float => CharacteristicValue::Float(0.0),
        };
        Self {
            kind,
            value: Mutex::new(value),
            binding_writes: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn binding_writes(&self) -> Vec<CharacteristicValue> {
        self.binding_writes.lock().unwrap().clone()
    }
}

impl Characteristic for StubCharacteristic {
    fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    fn value(&self) -> CharacteristicValue {
        *self.value.lock().unwrap()
    }

    fn set_from_binding(&self, value: CharacteristicValue) {
        *self.value.lock().unwrap() = value;
        self.binding_writes.lock().unwrap().push(value);
    }

    fn set_from_controller(&self, value: CharacteristicValue) {
        *self.value.lock().unwrap() = value;
        for handler in self.handlers.lock().unwrap().iter() {
            handler(value);
        }
    }

    fn on_remote_update(&self, handler: RemoteUpdateHandler) {
        self.handlers.lock().unwrap().push(handler);
    }

    fn clear_remote_update(&self) {
        self.handlers.lock().unwrap().clear();
    }
}

pub(crate) struct StubAccessory {
    descriptor: AccessoryDescriptor,
    characteristics: Vec<Arc<StubCharacteristic>>,
}

impl Accessory for StubAccessory {
    type Characteristic = StubCharacteristic;

    fn descriptor(&self) -> &AccessoryDescriptor {
        &self.descriptor
    }

    fn characteristic(&self, kind: CharacteristicKind) -> Option<Arc<StubCharacteristic>> {
        self.characteristics.iter().find(|c| c.kind == kind).cloned()
    }

    fn characteristics(&self) -> Vec<Arc<StubCharacteristic>> {
        self.characteristics.clone()
    }
}

pub(crate) struct StubProvider;

impl CapabilityProvider for StubProvider {
    type Accessory = StubAccessory;

    fn create_accessory(
        &self,
        descriptor: &AccessoryDescriptor,
    ) -> Result<Arc<StubAccessory>, ConfigError> {
        Ok(Arc::new(StubAccessory {
            descriptor: descriptor.clone(),
            characteristics: descriptor
                .variant()
                .characteristics()
                .iter()
                .map(|&kind| Arc::new(StubCharacteristic::new(kind)))
                .collect(),
        }))
    }
}

/// Bus that records publications and lets tests inject messages.
#[derive(Default)]
pub(crate) struct RecordingBus {
    published: Mutex<Vec<(String, String, bool)>>,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    fail_publish: Mutex<bool>,
    fail_subscribe: Mutex<bool>,
}

impl RecordingBus {
    pub(crate) fn published(&self) -> Vec<(String, String, bool)> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    pub(crate) fn subscribed(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.lock().unwrap().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub(crate) fn fail_publish(&self, fail: bool) {
        *self.fail_publish.lock().unwrap() = fail;
    }

    pub(crate) fn fail_subscribe(&self, fail: bool) {
        *self.fail_subscribe.lock().unwrap() = fail;
    }

    /// Deliver a message as if the broker had sent it.
    pub(crate) fn deliver(&self, topic: &str, payload: &[u8]) {
        let handler = self.handlers.lock().unwrap().get(topic).cloned();
        if let Some(handler) = handler {
            handler(topic, payload);
        }
    }
}

impl BusTransport for RecordingBus {
    fn publish(&self, topic: &str, payload: Vec<u8>, retained: bool) -> Result<(), PublishError> {
        if *self.fail_publish.lock().unwrap() {
            return Err(PublishError {
                topic: topic.to_string(),
                source: "request queue full".into(),
            });
        }
        self.published.lock().unwrap().push((
            topic.to_string(),
            String::from_utf8(payload).unwrap(),
            retained,
        ));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), SubscribeError> {
        if *self.fail_subscribe.lock().unwrap() {
            return Err(SubscribeError::Transport {
                topic: topic.to_string(),
                source: "not connected".into(),
            });
        }
        let mut handlers = self.handlers.lock().unwrap();
        if handlers.contains_key(topic) {
            return Err(SubscribeError::AlreadySubscribed(topic.to_string()));
        }
        handlers.insert(topic.to_string(), handler);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), SubscribeError> {
        self.handlers.lock().unwrap().remove(topic);
        Ok(())
    }
}
