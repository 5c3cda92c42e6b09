//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use hkbridge_app::ports::Accessory;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and includes a [`TraceLayer`] that
/// logs each HTTP request/response at the `DEBUG` level.
pub fn build<A>(state: AppState<A>) -> Router
where
    A: Accessory + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
