//! # hkbridge-adapter-mqtt
//!
//! MQTT adapter: implements the [`BusTransport`] port with `rumqttc`.
//!
//! ## Responsibilities
//! - Connect to the broker and wait for its first acknowledgement
//! - Dispatch each incoming publish to the handler registered for its exact topic
//! - Re-issue every subscription after a reconnect
//! - Publish at QoS 0 without blocking the caller
//!
//! ## Dependency rule
//! Same as other adapters: depends on `hkbridge-app` and `hkbridge-domain`.

mod config;
mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hkbridge_app::ports::{BusTransport, MessageHandler};
use hkbridge_domain::error::{PublishError, SubscribeError};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeFilter,
};
use tokio::task::JoinHandle;

pub use config::MqttConfig;
pub use error::MqttError;

const REQUEST_CAPACITY: usize = 10;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

type Handlers = Arc<Mutex<HashMap<String, MessageHandler>>>;

fn lock(handlers: &Handlers) -> MutexGuard<'_, HashMap<String, MessageHandler>> {
    handlers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broker connection shared by every accessory binding.
pub struct MqttBus {
    client: AsyncClient,
    handlers: Handlers,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttBus {
    /// Connect to the broker and start the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError`] if the broker cannot be reached, refuses the
    /// connection, or does not acknowledge it within the configured timeout.
    pub async fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive());
        if let Some((username, password)) = config.credentials() {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        tokio::time::timeout(config.connect_timeout(), wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| MqttError::Timeout(config.connect_timeout_secs))??;
        tracing::info!(host = %config.host, port = config.port, "connected to MQTT broker");

        let bus = Self::with_client(client);
        let task = tokio::spawn(run_event_loop(
            eventloop,
            bus.client.clone(),
            Arc::clone(&bus.handlers),
        ));
        *bus.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(bus)
    }

    fn with_client(client: AsyncClient) -> Self {
        Self {
            client,
            handlers: Arc::default(),
            task: Mutex::new(None),
        }
    }

    /// Send DISCONNECT and stop the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request could not be queued; the
    /// event loop is stopped regardless.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        let result = self.client.disconnect().await.map_err(MqttError::Client);
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut task) = task {
            if result.is_err() || tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }
        tracing::info!("disconnected from MQTT broker");
        result
    }
}

impl BusTransport for MqttBus {
    fn publish(&self, topic: &str, payload: Vec<u8>, retained: bool) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retained, payload)
            .map_err(|err| error::publish_error(topic, err))
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), SubscribeError> {
        {
            let mut handlers = lock(&self.handlers);
            if handlers.contains_key(topic) {
                return Err(SubscribeError::AlreadySubscribed(topic.to_string()));
            }
            handlers.insert(topic.to_string(), handler);
        }

        if let Err(err) = self.client.subscribe(topic, QoS::AtMostOnce).await {
            lock(&self.handlers).remove(topic);
            return Err(error::subscribe_error(topic, err));
        }
        tracing::debug!(%topic, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), SubscribeError> {
        if lock(&self.handlers).remove(topic).is_none() {
            return Ok(());
        }
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|err| error::subscribe_error(topic, err))?;
        tracing::debug!(%topic, "unsubscribed");
        Ok(())
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(MqttError::Refused(code)),
                };
            }
            Ok(_) => {}
            Err(err) => return Err(MqttError::Connection(err)),
        }
    }
}

async fn run_event_loop(mut eventloop: EventLoop, client: AsyncClient, handlers: Handlers) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if !dispatch(&handlers, &publish.topic, &publish.payload) {
                    tracing::trace!(topic = %publish.topic, "message without handler");
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("reconnected to MQTT broker");
                resubscribe(&client, &handlers);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "MQTT connection error");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Hand a message to the handler registered for `topic`.
///
/// Returns `false` when no handler is registered.
fn dispatch(handlers: &Handlers, topic: &str, payload: &[u8]) -> bool {
    let handler = lock(handlers).get(topic).cloned();
    match handler {
        Some(handler) => {
            handler(topic, payload);
            true
        }
        None => false,
    }
}

/// Clean sessions drop subscriptions on reconnect. Runs on the event-loop
/// task, so every topic goes into a single queued SUBSCRIBE request.
fn resubscribe(client: &AsyncClient, handlers: &Handlers) {
    let filters: Vec<SubscribeFilter> = lock(handlers)
        .keys()
        .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce))
        .collect();
    if filters.is_empty() {
        return;
    }
    let count = filters.len();
    match client.try_subscribe_many(filters) {
        Ok(()) => tracing::debug!(count, "re-subscribed"),
        Err(err) => tracing::warn!(count, %err, "failed to re-subscribe"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn offline_bus() -> (MqttBus, EventLoop) {
        let options = MqttOptions::new("test", "localhost", 1883);
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        (MqttBus::with_client(client), eventloop)
    }

    fn counting_handler() -> (MessageHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: MessageHandler = Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handler, calls)
    }

    #[tokio::test]
    async fn should_dispatch_to_exact_topic_only() {
        let (bus, _eventloop) = offline_bus();
        let (handler, calls) = counting_handler();
        bus.subscribe("light_kitchen/state", handler).await.unwrap();

        assert!(dispatch(&bus.handlers, "light_kitchen/state", b"on"));
        assert!(!dispatch(&bus.handlers, "light_kitchen/control", b"on"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_reject_second_subscription_of_same_topic() {
        let (bus, _eventloop) = offline_bus();
        let (first, _) = counting_handler();
        let (second, _) = counting_handler();
        bus.subscribe("switch_plug/state", first).await.unwrap();

        let result = bus.subscribe("switch_plug/state", second).await;

        assert!(matches!(result, Err(SubscribeError::AlreadySubscribed(topic)) if topic == "switch_plug/state"));
    }

    #[tokio::test]
    async fn should_stop_dispatching_after_unsubscribe() {
        let (bus, _eventloop) = offline_bus();
        let (handler, calls) = counting_handler();
        bus.subscribe("sensor/temperature/attic", handler).await.unwrap();

        bus.unsubscribe("sensor/temperature/attic").await.unwrap();

        assert!(!dispatch(&bus.handlers, "sensor/temperature/attic", b"21.5"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_ignore_unsubscribe_of_unknown_topic() {
        let (bus, _eventloop) = offline_bus();
        assert!(bus.unsubscribe("nobody/listens").await.is_ok());
    }

    #[tokio::test]
    async fn should_drop_handler_when_transport_is_closed() {
        let (bus, eventloop) = offline_bus();
        drop(eventloop);
        let (handler, _) = counting_handler();

        let result = bus.subscribe("light_desk/state", handler).await;

        assert!(matches!(result, Err(SubscribeError::Transport { .. })));
        assert!(lock(&bus.handlers).is_empty());
    }

    #[tokio::test]
    async fn should_resubscribe_more_topics_than_request_capacity() {
        let (bus, _eventloop) = offline_bus();
        for index in 0..REQUEST_CAPACITY + 2 {
            let (handler, _) = counting_handler();
            lock(&bus.handlers).insert(format!("sensor/temperature/room{index}"), handler);
        }

        resubscribe(&bus.client, &bus.handlers);

        assert!(bus.client.try_subscribe("light_hall/state", QoS::AtMostOnce).is_ok());
    }

    #[tokio::test]
    async fn should_skip_resubscribe_without_handlers() {
        let (bus, _eventloop) = offline_bus();

        resubscribe(&bus.client, &bus.handlers);

        for index in 0..REQUEST_CAPACITY {
            let topic = format!("light_{index}/control");
            assert!(
                bus.client
                    .try_publish(topic, QoS::AtMostOnce, false, "on")
                    .is_ok()
            );
        }
    }

    #[tokio::test]
    async fn should_queue_publish_without_waiting() {
        let (bus, _eventloop) = offline_bus();
        assert!(bus.publish("light_kitchen/control", b"power:on".to_vec(), false).is_ok());
    }

    #[tokio::test]
    async fn should_report_publish_error_with_topic() {
        let (bus, eventloop) = offline_bus();
        drop(eventloop);

        let err = bus
            .publish("light_kitchen/control", b"power:on".to_vec(), false)
            .unwrap_err();

        assert_eq!(err.topic, "light_kitchen/control");
    }

    #[tokio::test]
    async fn should_fail_to_connect_without_broker() {
        let config = MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 2,
            ..MqttConfig::default()
        };

        let result = MqttBus::connect(&config).await;

        assert!(matches!(
            result,
            Err(MqttError::Connection(_) | MqttError::Timeout(2))
        ));
    }
}
