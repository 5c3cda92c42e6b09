//! # hkbridge-app
//!
//! Application layer: accessory bindings, the bridge registry and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `CapabilityProvider` / `Accessory` / `Characteristic`: accessory
//!     model with controller-originated and bridge-originated writes
//!   - `BusTransport`: publish/subscribe on the message bus
//!   - `AccessoryServer`: advertise accessories to controllers
//! - `AccessoryBinding`: synchronize one accessory with its bus topics,
//!   suppressing echoes of its own publications
//! - `BridgeRegistry`: build every binding from configuration, fail fast,
//!   detach on shutdown
//!
//! ## Dependency rule
//! Depends on `hkbridge-domain` only (plus `tokio::sync` for the fault channel).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod binding;
pub mod ports;
pub mod registry;

#[cfg(test)]
mod testing;
