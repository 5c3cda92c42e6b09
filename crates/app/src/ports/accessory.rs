//! Accessory ports: the capability provider that owns characteristic values
//! and the accessory-protocol transport that advertises them to controllers.

use std::future::Future;
use std::sync::Arc;

use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};
use hkbridge_domain::descriptor::AccessoryDescriptor;
use hkbridge_domain::error::ConfigError;

/// Callback fired with the new value whenever a controller changes a
/// characteristic.
pub type RemoteUpdateHandler = Box<dyn Fn(CharacteristicValue) + Send + Sync>;

/// One characteristic of an accessory.
///
/// The two setters are the whole contract between the bridge and the
/// provider: [`set_from_controller`](Self::set_from_controller) fires the
/// remote-update handlers, [`set_from_binding`](Self::set_from_binding)
/// never does. A binding relies on this to apply bus state without
/// re-publishing it.
pub trait Characteristic: Send + Sync {
    fn kind(&self) -> CharacteristicKind;

    /// Current value.
    fn value(&self) -> CharacteristicValue;

    /// Apply a value observed on the bus. Must not notify remote-update
    /// handlers.
    fn set_from_binding(&self, value: CharacteristicValue);

    /// Apply a value written by a controller and notify every remote-update
    /// handler, synchronously, after the value is stored.
    fn set_from_controller(&self, value: CharacteristicValue);

    /// Register a handler for controller-originated updates.
    fn on_remote_update(&self, handler: RemoteUpdateHandler);

    /// Drop every registered remote-update handler.
    fn clear_remote_update(&self);
}

/// An accessory built by a [`CapabilityProvider`].
pub trait Accessory: Send + Sync {
    type Characteristic: Characteristic + 'static;

    /// Descriptor the accessory was built from.
    fn descriptor(&self) -> &AccessoryDescriptor;

    /// Look up a characteristic by kind.
    fn characteristic(&self, kind: CharacteristicKind) -> Option<Arc<Self::Characteristic>>;

    /// Every characteristic, in the variant's declaration order.
    fn characteristics(&self) -> Vec<Arc<Self::Characteristic>>;
}

/// Builds accessories with the characteristic set of their variant.
pub trait CapabilityProvider {
    type Accessory: Accessory + 'static;

    /// Build the accessory described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the provider cannot represent the
    /// descriptor.
    fn create_accessory(
        &self,
        descriptor: &AccessoryDescriptor,
    ) -> Result<Arc<Self::Accessory>, ConfigError>;
}

/// Accessory-protocol transport: advertises accessories to controllers.
///
/// The daemon calls [`start`](Self::start) once with the full accessory
/// list (the first one is the primary bridge identity) and
/// [`stop`](Self::stop) on shutdown.
pub trait AccessoryServer<A: Accessory> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn start(
        &mut self,
        accessories: Vec<Arc<A>>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn stop(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
