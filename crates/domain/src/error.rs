//! Error types shared across the workspace.
//!
//! Each failure class of the bridge has its own typed error; [`BridgeError`]
//! is the umbrella used at port boundaries and converts from each of them
//! via `#[from]`.

use crate::characteristic::{CharacteristicKind, ValueType};
use crate::variant::DeviceVariant;

/// Boxed transport error carried as the source of publish/subscribe failures.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed descriptor or inconsistent configuration.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// An inbound payload could not be decoded.
    #[error("decode error")]
    Decode(#[from] DecodeError),

    /// An outbound value could not be encoded.
    #[error("encode error")]
    Encode(#[from] EncodeError),

    /// The bus transport refused an outbound message.
    #[error("publish error")]
    Publish(#[from] PublishError),

    /// The bus transport refused a subscription.
    #[error("subscribe error")]
    Subscribe(#[from] SubscribeError),
}

/// Descriptor validation and registry construction failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("accessory identifier must not be empty")]
    EmptyIdentifier,

    #[error("accessory identifier {0:?} contains a topic separator, wildcard or whitespace")]
    InvalidIdentifier(String),

    #[error("accessory {identifier:?} has an empty name")]
    EmptyName { identifier: String },

    #[error("accessory {identifier:?} has no kind")]
    MissingKind { identifier: String },

    #[error("accessory {identifier:?} has an empty {field}")]
    EmptyTopic {
        identifier: String,
        field: &'static str,
    },

    #[error("accessory {identifier:?} has an invalid range (min {min}, max {max}, step {step})")]
    InvalidRange {
        identifier: String,
        min: f64,
        max: f64,
        step: f64,
    },

    #[error("inbound topic {topic:?} is shared by accessories {first:?} and {second:?}")]
    TopicCollision {
        topic: String,
        first: String,
        second: String,
    },

    #[error("accessory {identifier:?} was built without {kind}")]
    MissingCharacteristic {
        identifier: String,
        kind: CharacteristicKind,
    },

    #[error("at least one accessory must be configured")]
    NoAccessories,
}

/// Failure to turn an inbound payload into a characteristic value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("{kind} is not carried by {variant} accessories")]
    UnsupportedKind {
        variant: DeviceVariant,
        kind: CharacteristicKind,
    },

    #[error("malformed {kind} payload {payload:?}")]
    Malformed {
        kind: CharacteristicKind,
        payload: String,
    },
}

/// Failure to turn a characteristic value into an outbound payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("{kind} is not carried by {variant} accessories")]
    UnsupportedKind {
        variant: DeviceVariant,
        kind: CharacteristicKind,
    },

    #[error("{kind} expects a {expected} value")]
    TypeMismatch {
        kind: CharacteristicKind,
        expected: ValueType,
    },

    #[error("{kind} cannot encode negative value {value}")]
    Negative { kind: CharacteristicKind, value: i64 },
}

/// The bus transport failed to accept an outbound message.
#[derive(Debug, thiserror::Error)]
#[error("failed to publish on {topic:?}")]
pub struct PublishError {
    pub topic: String,
    #[source]
    pub source: TransportSource,
}

/// The bus transport failed to register (or drop) a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("topic {0:?} is already subscribed")]
    AlreadySubscribed(String),

    #[error("failed to subscribe to {topic:?}")]
    Transport {
        topic: String,
        #[source]
        source: TransportSource,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_config_error_into_bridge_error() {
        let err: BridgeError = ConfigError::EmptyIdentifier.into();
        assert!(matches!(err, BridgeError::Config(ConfigError::EmptyIdentifier)));
    }

    #[test]
    fn should_display_topic_collision() {
        let err = ConfigError::TopicCollision {
            topic: "switch_a/state".to_string(),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "inbound topic \"switch_a/state\" is shared by accessories \"a\" and \"b\""
        );
    }

    #[test]
    fn should_keep_transport_source_on_publish_error() {
        let err = PublishError {
            topic: "light_x/control".to_string(),
            source: "queue full".into(),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("queue full"));
    }

    #[test]
    fn should_display_malformed_payload() {
        let err = DecodeError::Malformed {
            kind: CharacteristicKind::Brightness,
            payload: "bright".to_string(),
        };
        assert_eq!(err.to_string(), "malformed Brightness payload \"bright\"");
    }
}
