//! In-memory characteristic.

use std::sync::{Mutex, MutexGuard, PoisonError};

use hkbridge_app::ports::{Characteristic, RemoteUpdateHandler};
use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};

/// A characteristic value with its remote-update handlers.
pub struct MemoryCharacteristic {
    kind: CharacteristicKind,
    value: Mutex<CharacteristicValue>,
    handlers: Mutex<Vec<RemoteUpdateHandler>>,
}

impl MemoryCharacteristic {
    #[must_use]
    pub fn new(kind: CharacteristicKind, initial: CharacteristicValue) -> Self {
        Self {
            kind,
            value: Mutex::new(initial),
            handlers: Mutex::new(Vec::new()),
        }
    }

    fn lock_value(&self) -> MutexGuard<'_, CharacteristicValue> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_handlers(&self) -> MutexGuard<'_, Vec<RemoteUpdateHandler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Characteristic for MemoryCharacteristic {
    fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    fn value(&self) -> CharacteristicValue {
        *self.lock_value()
    }

    fn set_from_binding(&self, value: CharacteristicValue) {
        *self.lock_value() = value;
    }

    fn set_from_controller(&self, value: CharacteristicValue) {
        *self.lock_value() = value;
        for handler in self.lock_handlers().iter() {
            handler(value);
        }
    }

    fn on_remote_update(&self, handler: RemoteUpdateHandler) {
        self.lock_handlers().push(handler);
    }

    fn clear_remote_update(&self) {
        self.lock_handlers().clear();
    }
}
