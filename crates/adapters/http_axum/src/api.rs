//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod accessories;

use axum::Router;
use axum::routing::{get, put};

use hkbridge_app::ports::Accessory;

use crate::state::AppState;

/// Header carrying the pairing PIN on controller writes.
pub const PIN_HEADER: &str = "x-pairing-pin";

/// Build the `/api` sub-router.
pub fn routes<A>() -> Router<AppState<A>>
where
    A: Accessory + 'static,
{
    Router::new()
        .route("/accessories", get(accessories::list::<A>))
        .route("/accessories/{aid}", get(accessories::get::<A>))
        .route(
            "/accessories/{aid}/characteristics/{kind}",
            put(accessories::set_characteristic::<A>),
        )
}
