//! # hkbridge-adapter-http-axum
//!
//! Controller surface built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Advertise the bridged accessories as JSON (`/api/accessories`), each
//!   with a stable 1-based accessory id in construction order
//! - Accept controller writes (`PUT /api/accessories/{aid}/characteristics/{kind}`)
//!   guarded by the pairing PIN, and hand them to the accessory as
//!   controller-originated updates
//! - Own the listener lifecycle through the [`AccessoryServer`] port
//!
//! ## Dependency rule
//! Depends on `hkbridge-app` (for port traits) and `hkbridge-domain`
//! (for domain types used in request/response mapping). Never leaks axum
//! types into the domain.
//!
//! [`AccessoryServer`]: hkbridge_app::ports::AccessoryServer

pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::HttpError;
pub use server::HttpAccessoryServer;
