//! HTTP error types and response mapping.

use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hkbridge_domain::characteristic::{CharacteristicKind, ValueType};

/// Lifecycle failures of the controller surface.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to create storage directory {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("controller surface is already running")]
    AlreadyRunning,

    #[error("HTTP server failed")]
    Serve(#[source] std::io::Error),

    #[error("HTTP server task failed")]
    Join(#[source] tokio::task::JoinError),
}

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Request-level failures, mapped to status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or wrong pairing PIN")]
    Unauthorized,

    #[error("no accessory with aid {0}")]
    AccessoryNotFound(usize),

    #[error("accessory {aid} has no characteristic {kind:?}")]
    CharacteristicNotFound { aid: usize, kind: String },

    #[error("{0} is read-only")]
    ReadOnly(CharacteristicKind),

    #[error("{kind} expects a {expected} value")]
    InvalidType {
        kind: CharacteristicKind,
        expected: ValueType,
    },

    #[error("{kind} value {value} is outside {min}..={max}")]
    OutOfRange {
        kind: CharacteristicKind,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AccessoryNotFound(_) | Self::CharacteristicNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::ReadOnly(_) | Self::InvalidType { .. } | Self::OutOfRange { .. } => {
                StatusCode::BAD_REQUEST
            }
        };
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("rejected controller write without a valid pairing PIN");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
