//! Shared application state for axum handlers.

use std::sync::Arc;

use hkbridge_app::ports::Accessory;

/// State shared across all axum handlers.
///
/// Generic over the accessory type to avoid dynamic dispatch. `Clone` is
/// implemented manually so `A` itself does not need to be `Clone`.
pub struct AppState<A> {
    /// Bridged accessories; index + 1 is the accessory id.
    pub accessories: Arc<[Arc<A>]>,
    /// Pairing PIN required on writes.
    pub pin: Arc<str>,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            accessories: Arc::clone(&self.accessories),
            pin: Arc::clone(&self.pin),
        }
    }
}

impl<A: Accessory + 'static> AppState<A> {
    pub fn new(accessories: Vec<Arc<A>>, pin: &str) -> Self {
        Self {
            accessories: accessories.into(),
            pin: pin.into(),
        }
    }

    /// Look up an accessory by its 1-based id.
    #[must_use]
    pub fn accessory(&self, aid: usize) -> Option<&Arc<A>> {
        aid.checked_sub(1)
            .and_then(|index| self.accessories.get(index))
    }
}
