//! # hkbridge-domain
//!
//! Pure domain model for the accessory ↔ MQTT bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, characteristic kinds and values
//! - Define **device variants** and their per-variant wire conventions
//! - Define **accessory descriptors** (validated, immutable configuration)
//! - Provide the **wire codec** (value ↔ payload) and the **topic scheme**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod characteristic;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod topic;
pub mod variant;
