//! Accessory binding: keeps one accessory and its bus topics in sync.
//!
//! A binding owns one slot per characteristic of its accessory. Each slot
//! caches the last value accepted from either direction:
//!
//! - **outbound**: a controller changes a characteristic, the provider fires
//!   the remote-update handler, the binding encodes and publishes the value
//!   and stores it in the cache. Every update is published, even when it
//!   matches the cache.
//! - **inbound**: a message arrives on a subscribed topic, the binding
//!   decodes it and compares it with the cache. Equal values are echoes and
//!   are dropped; anything else is applied with
//!   [`Characteristic::set_from_binding`] so it is not published again.
//!
//! Both paths run to completion under the slot's mutex, which is the only
//! lock involved: slots never wait on each other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};
use hkbridge_domain::codec::WireCodec;
use hkbridge_domain::descriptor::AccessoryDescriptor;
use hkbridge_domain::error::{BridgeError, ConfigError};
use hkbridge_domain::topic::TopicSet;
use hkbridge_domain::variant::DeviceVariant;
use tokio::sync::mpsc;

use crate::ports::{Accessory, BusTransport, CapabilityProvider, Characteristic, MessageHandler};

/// Receives the fatal errors raised on the outbound path.
pub type FaultSender = mpsc::UnboundedSender<BridgeError>;

/// One characteristic with its last accepted value.
struct Slot<C> {
    kind: CharacteristicKind,
    characteristic: Arc<C>,
    cached: Mutex<CharacteristicValue>,
}

impl<C: Characteristic> Slot<C> {
    fn new(characteristic: Arc<C>) -> Self {
        Self {
            kind: characteristic.kind(),
            cached: Mutex::new(characteristic.value()),
            characteristic,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CharacteristicValue> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a decoded bus value unless it matches the cache.
    ///
    /// Returns whether the characteristic was updated.
    fn apply_from_bus(&self, value: CharacteristicValue) -> bool {
        let mut cached = self.lock();
        if *cached == value {
            return false;
        }
        self.characteristic.set_from_binding(value);
        *cached = value;
        true
    }
}

/// Handles controller updates of one slot.
struct OutboundRoute<C, B> {
    accessory: String,
    codec: WireCodec,
    topic: String,
    retained: bool,
    slot: Arc<Slot<C>>,
    bus: Arc<B>,
    faults: FaultSender,
}

impl<C: Characteristic, B: BusTransport> OutboundRoute<C, B> {
    fn handle(&self, value: CharacteristicValue) {
        if let Err(err) = self.publish(value) {
            tracing::error!(
                accessory = %self.accessory,
                characteristic = %self.slot.kind,
                topic = %self.topic,
                %err,
                "failed to relay controller update"
            );
            if self.faults.send(err).is_err() {
                tracing::error!("fault channel closed, controller update lost");
            }
        }
    }

    fn publish(&self, value: CharacteristicValue) -> Result<(), BridgeError> {
        let mut cached = self.slot.lock();
        let payload = self.codec.encode(self.slot.kind, value)?;
        tracing::debug!(
            accessory = %self.accessory,
            characteristic = %self.slot.kind,
            topic = %self.topic,
            %value,
            "publishing controller update"
        );
        self.bus.publish(&self.topic, payload, self.retained)?;
        *cached = value;
        Ok(())
    }
}

/// Handles messages of one subscribed topic.
///
/// The payload is decoded once, as the first target's kind, and applied to
/// every target.
struct InboundRoute<C> {
    accessory: String,
    codec: WireCodec,
    targets: Vec<Arc<Slot<C>>>,
}

impl<C: Characteristic> InboundRoute<C> {
    fn handle(&self, topic: &str, payload: &[u8]) {
        let Some(first) = self.targets.first() else {
            return;
        };
        let value = match self.codec.decode(first.kind, payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(accessory = %self.accessory, topic, %err, "dropping undecodable message");
                return;
            }
        };
        for slot in &self.targets {
            if slot.apply_from_bus(value) {
                tracing::debug!(
                    accessory = %self.accessory,
                    characteristic = %slot.kind,
                    %value,
                    "value externally changed"
                );
            } else {
                tracing::trace!(
                    accessory = %self.accessory,
                    characteristic = %slot.kind,
                    topic,
                    "echo suppressed"
                );
            }
        }
    }
}

/// Outbound wiring of a variant: `(kind, topic, retained)`.
fn outbound_plan(
    variant: DeviceVariant,
    topics: &TopicSet,
) -> Vec<(CharacteristicKind, String, bool)> {
    use CharacteristicKind as K;
    let mut plan = Vec::new();
    match variant {
        DeviceVariant::Light | DeviceVariant::Switch => {
            if let Some(control) = &topics.control {
                for &kind in variant.characteristics() {
                    plan.push((kind, control.clone(), false));
                }
            }
        }
        DeviceVariant::ThermostatControllable => {
            if let Some(target) = &topics.target {
                plan.push((K::TargetTemperature, target.clone(), true));
            }
            if let Some(active) = &topics.active {
                plan.push((K::TargetHeatingCoolingState, active.clone(), true));
            }
        }
        DeviceVariant::TemperatureSensorOnly => {}
    }
    plan
}

/// Inbound wiring of a variant: `(topic, kinds)`.
///
/// The thermostat active topic reports the mode the device is running,
/// which is authoritative for both the current and the desired mode.
fn inbound_plan(
    variant: DeviceVariant,
    topics: &TopicSet,
) -> Vec<(String, Vec<CharacteristicKind>)> {
    use CharacteristicKind as K;
    let mut plan = Vec::new();
    match variant {
        DeviceVariant::Light | DeviceVariant::Switch => {
            if let Some(state) = &topics.state {
                plan.push((state.clone(), vec![K::On]));
            }
        }
        DeviceVariant::ThermostatControllable | DeviceVariant::TemperatureSensorOnly => {
            if let Some(state) = &topics.state {
                plan.push((state.clone(), vec![K::CurrentTemperature]));
            }
            if let Some(target) = &topics.target {
                plan.push((target.clone(), vec![K::TargetTemperature]));
            }
            if let Some(active) = &topics.active {
                plan.push((
                    active.clone(),
                    vec![K::CurrentHeatingCoolingState, K::TargetHeatingCoolingState],
                ));
            }
        }
    }
    plan
}

/// Synchronizes one accessory with its bus topics.
pub struct AccessoryBinding<A: Accessory, B> {
    accessory: Arc<A>,
    topics: TopicSet,
    slots: Vec<Arc<Slot<A::Characteristic>>>,
    subscriptions: Vec<String>,
    bus: Arc<B>,
}

impl<A, B> AccessoryBinding<A, B>
where
    A: Accessory + 'static,
    B: BusTransport + 'static,
{
    /// Build the accessory for `descriptor`, register the outbound handlers,
    /// subscribe the inbound topics and, for thermostats, publish the
    /// retained configuration snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the provider rejects the
    /// descriptor or omits a characteristic, [`BridgeError::Subscribe`] when
    /// a subscription fails and [`BridgeError::Publish`] when the snapshot
    /// cannot be published.
    pub async fn bind<P>(
        provider: &P,
        bus: Arc<B>,
        descriptor: &AccessoryDescriptor,
        faults: FaultSender,
    ) -> Result<Self, BridgeError>
    where
        P: CapabilityProvider<Accessory = A>,
    {
        let variant = descriptor.variant();
        let accessory = provider.create_accessory(descriptor)?;
        let topics = TopicSet::for_descriptor(descriptor);
        let codec = WireCodec::new(variant, descriptor.kind.boolean_style());

        let slots = variant
            .characteristics()
            .iter()
            .map(|&kind| {
                accessory
                    .characteristic(kind)
                    .map(|characteristic| Arc::new(Slot::new(characteristic)))
                    .ok_or_else(|| ConfigError::MissingCharacteristic {
                        identifier: descriptor.identifier.clone(),
                        kind,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut binding = Self {
            accessory,
            topics,
            slots,
            subscriptions: Vec::new(),
            bus,
        };
        if let Err(err) = binding.wire(descriptor, codec, &faults).await {
            if let Err(detach_err) = binding.detach().await {
                tracing::warn!(%detach_err, "failed to detach partially bound accessory");
            }
            return Err(err);
        }

        tracing::info!(
            accessory = %descriptor.identifier,
            name = %descriptor.name,
            %variant,
            "accessory bound"
        );
        Ok(binding)
    }

    async fn wire(
        &mut self,
        descriptor: &AccessoryDescriptor,
        codec: WireCodec,
        faults: &FaultSender,
    ) -> Result<(), BridgeError> {
        let variant = codec.variant();

        for (kind, topic, retained) in outbound_plan(variant, &self.topics) {
            let Some(slot) = self.slot(kind) else {
                continue;
            };
            let route = OutboundRoute {
                accessory: descriptor.identifier.clone(),
                codec,
                topic,
                retained,
                slot: Arc::clone(slot),
                bus: Arc::clone(&self.bus),
                faults: faults.clone(),
            };
            slot.characteristic
                .on_remote_update(Box::new(move |value| route.handle(value)));
        }

        for (topic, kinds) in inbound_plan(variant, &self.topics) {
            let route = InboundRoute {
                accessory: descriptor.identifier.clone(),
                codec,
                targets: kinds
                    .iter()
                    .filter_map(|&kind| self.slot(kind).cloned())
                    .collect(),
            };
            let handler: MessageHandler =
                Arc::new(move |topic: &str, payload: &[u8]| route.handle(topic, payload));
            self.bus.subscribe(&topic, handler).await?;
            tracing::debug!(accessory = %descriptor.identifier, topic = %topic, "subscribed");
            self.subscriptions.push(topic);
        }

        if let Some(config) = &self.topics.config {
            let snapshot = config_snapshot(descriptor);
            self.bus.publish(config, snapshot.into_bytes(), true)?;
        }
        Ok(())
    }

    fn slot(&self, kind: CharacteristicKind) -> Option<&Arc<Slot<A::Characteristic>>> {
        self.slots.iter().find(|slot| slot.kind == kind)
    }

    #[must_use]
    pub fn accessory(&self) -> &Arc<A> {
        &self.accessory
    }

    #[must_use]
    pub fn descriptor(&self) -> &AccessoryDescriptor {
        self.accessory.descriptor()
    }

    #[must_use]
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// Topics this binding is subscribed to.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Last accepted value of `kind`.
    #[must_use]
    pub fn cached(&self, kind: CharacteristicKind) -> Option<CharacteristicValue> {
        self.slot(kind).map(|slot| *slot.lock())
    }

    /// Clear the remote-update handlers and drop every subscription.
    ///
    /// Keeps going after a failed unsubscribe so every topic gets a chance.
    ///
    /// # Errors
    ///
    /// Returns the first [`BridgeError::Subscribe`] encountered.
    pub async fn detach(&mut self) -> Result<(), BridgeError> {
        for slot in &self.slots {
            slot.characteristic.clear_remote_update();
        }
        let mut first_error = None;
        for topic in self.subscriptions.drain(..) {
            if let Err(err) = self.bus.unsubscribe(&topic).await {
                tracing::warn!(topic = %topic, %err, "failed to unsubscribe");
                first_error.get_or_insert(err);
            }
        }
        tracing::debug!(accessory = %self.descriptor().identifier, "accessory detached");
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }
}

fn config_snapshot(descriptor: &AccessoryDescriptor) -> String {
    let range = descriptor.kind.range().unwrap_or_default();
    serde_json::json!({
        "name": descriptor.name,
        "manufacturer": descriptor.manufacturer,
        "controllable": descriptor.variant() == DeviceVariant::ThermostatControllable,
        "min": range.min,
        "max": range.max,
        "step": range.step,
    })
    .to_string()
}
