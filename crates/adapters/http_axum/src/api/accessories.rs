//! JSON REST handlers for accessories and their characteristics.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hkbridge_app::ports::{Accessory, Characteristic};
use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};
use hkbridge_domain::descriptor::AccessoryDescriptor;
use hkbridge_domain::variant::DeviceVariant;

use crate::api::PIN_HEADER;
use crate::error::ApiError;
use crate::state::AppState;

/// One accessory as seen by controllers.
#[derive(Debug, Serialize)]
pub struct AccessoryView {
    pub aid: usize,
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub variant: DeviceVariant,
    pub characteristics: Vec<CharacteristicView>,
}

/// A characteristic value with its valid bounds, when it has any.
#[derive(Debug, Serialize)]
pub struct CharacteristicView {
    pub kind: CharacteristicKind,
    pub value: CharacteristicValue,
    #[serde(flatten)]
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Request body for a controller write.
#[derive(Deserialize)]
pub struct SetValueRequest {
    pub value: serde_json::Value,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<AccessoryView>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<AccessoryView>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the write endpoint.
pub enum SetResponse {
    NoContent,
}

impl IntoResponse for SetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/accessories`
pub async fn list<A>(State(state): State<AppState<A>>) -> ListResponse
where
    A: Accessory + 'static,
{
    let views = state
        .accessories
        .iter()
        .enumerate()
        .map(|(index, accessory)| view(index + 1, accessory.as_ref()))
        .collect();
    ListResponse::Ok(Json(views))
}

/// `GET /api/accessories/{aid}`
pub async fn get<A>(
    State(state): State<AppState<A>>,
    Path(aid): Path<usize>,
) -> Result<GetResponse, ApiError>
where
    A: Accessory + 'static,
{
    let accessory = state.accessory(aid).ok_or(ApiError::AccessoryNotFound(aid))?;
    Ok(GetResponse::Ok(Json(view(aid, accessory.as_ref()))))
}

/// `PUT /api/accessories/{aid}/characteristics/{kind}`
///
/// Applies the value as a controller write: the accessory's remote-update
/// handlers fire and the owning binding publishes it.
pub async fn set_characteristic<A>(
    State(state): State<AppState<A>>,
    Path((aid, kind_name)): Path<(usize, String)>,
    headers: HeaderMap,
    Json(request): Json<SetValueRequest>,
) -> Result<SetResponse, ApiError>
where
    A: Accessory + 'static,
{
    let presented = headers.get(PIN_HEADER).and_then(|value| value.to_str().ok());
    if presented != Some(&*state.pin) {
        return Err(ApiError::Unauthorized);
    }

    let accessory = state.accessory(aid).ok_or(ApiError::AccessoryNotFound(aid))?;
    let not_found = || ApiError::CharacteristicNotFound {
        aid,
        kind: kind_name.clone(),
    };
    let kind = CharacteristicKind::from_str(&kind_name).map_err(|_| not_found())?;
    let characteristic = accessory.characteristic(kind).ok_or_else(not_found)?;
    if kind.read_only() {
        return Err(ApiError::ReadOnly(kind));
    }

    let value = parse_value(kind, request.value)?;
    if let Some(bounds) = bounds(kind, accessory.descriptor()) {
        check_bounds(kind, value, bounds)?;
    }

    tracing::debug!(
        accessory = %accessory.descriptor().identifier,
        characteristic = %kind,
        %value,
        "controller write"
    );
    characteristic.set_from_controller(value);
    Ok(SetResponse::NoContent)
}

fn view<A: Accessory>(aid: usize, accessory: &A) -> AccessoryView {
    let descriptor = accessory.descriptor();
    AccessoryView {
        aid,
        identifier: descriptor.identifier.clone(),
        name: descriptor.name.clone(),
        manufacturer: descriptor.manufacturer.clone(),
        variant: descriptor.variant(),
        characteristics: accessory
            .characteristics()
            .iter()
            .map(|characteristic| CharacteristicView {
                kind: characteristic.kind(),
                value: characteristic.value(),
                bounds: bounds(characteristic.kind(), descriptor),
            })
            .collect(),
    }
}

fn parse_value(
    kind: CharacteristicKind,
    raw: serde_json::Value,
) -> Result<CharacteristicValue, ApiError> {
    let expected = kind.value_type();
    serde_json::from_value::<CharacteristicValue>(raw)
        .ok()
        .and_then(|value| expected.coerce(value))
        .ok_or(ApiError::InvalidType { kind, expected })
}

/// Valid bounds of a numeric characteristic. Temperatures use the
/// accessory's configured range.
fn bounds(kind: CharacteristicKind, descriptor: &AccessoryDescriptor) -> Option<Bounds> {
    let fixed = |max: f64| {
        Some(Bounds {
            min: 0.0,
            max,
            step: 1.0,
        })
    };
    match kind {
        CharacteristicKind::On => None,
        CharacteristicKind::Brightness | CharacteristicKind::Saturation => fixed(100.0),
        CharacteristicKind::Hue => fixed(360.0),
        CharacteristicKind::TargetHeatingCoolingState => fixed(3.0),
        CharacteristicKind::CurrentHeatingCoolingState => fixed(2.0),
        CharacteristicKind::TargetTemperature | CharacteristicKind::CurrentTemperature => {
            descriptor.kind.range().map(|range| Bounds {
                min: range.min,
                max: range.max,
                step: range.step,
            })
        }
    }
}

fn check_bounds(
    kind: CharacteristicKind,
    value: CharacteristicValue,
    bounds: Bounds,
) -> Result<(), ApiError> {
    #[allow(clippy::cast_precision_loss)]
    let numeric = match value {
        CharacteristicValue::Bool(_) => return Ok(()),
        CharacteristicValue::Int(n) => n as f64,
        CharacteristicValue::Float(f) => f,
    };
    if numeric < bounds.min || numeric > bounds.max {
        return Err(ApiError::OutOfRange {
            kind,
            value: numeric,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(())
}
