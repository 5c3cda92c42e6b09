//! MQTT adapter error types.

use hkbridge_domain::error::{PublishError, SubscribeError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The event loop failed before the broker acknowledged the connection.
    #[error("failed to connect to the MQTT broker")]
    Connection(#[source] rumqttc::ConnectionError),

    /// The broker answered the connection with a non-success code.
    #[error("MQTT broker refused the connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    /// No acknowledgement arrived within the configured timeout.
    #[error("MQTT broker did not acknowledge the connection within {0}s")]
    Timeout(u16),

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

pub(crate) fn publish_error(topic: &str, err: rumqttc::ClientError) -> PublishError {
    PublishError {
        topic: topic.to_string(),
        source: Box::new(err),
    }
}

pub(crate) fn subscribe_error(topic: &str, err: rumqttc::ClientError) -> SubscribeError {
    SubscribeError::Transport {
        topic: topic.to_string(),
        source: Box::new(err),
    }
}
