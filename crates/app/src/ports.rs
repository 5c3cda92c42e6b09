//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the bridge core and the outside world.
//! They are defined here (in `app`) so that both the bindings and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod accessory;
pub mod bus;

pub use accessory::{
    Accessory, AccessoryServer, CapabilityProvider, Characteristic, RemoteUpdateHandler,
};
pub use bus::{BusTransport, MessageHandler};
