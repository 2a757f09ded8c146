//! MQTT messaging gateway.
//!
//! | Topic            | Direction        | Payload                                |
//! |------------------|------------------|----------------------------------------|
//! | `command_topic`  | inbound          | `OPEN` / `CLOSE` / `STOP`              |
//! | `state_topic`    | outbound, retain | `OPEN` / `CLOSED`                      |
//! | `realtime_topic` | outbound         | `OPEN` / `CLOSED` / `RUNNING` / `UNKNOWN` |
//!
//! Inbound traffic is routed by [`Gateway`] into [`DoorRequest`]s on the
//! command queue; it never touches the motor.  Outbound publishes go through
//! [`MqttStatePublisher`], which enqueues into the client's outbox and
//! returns without waiting for the broker.
//!
//! ## Threads
//!
//! ```text
//!   mqtt-rx:  EspMqttConnection::next() ──▶ Gateway::handle ──▶ CommandQueue
//!   net:      Wi-Fi supervision + (re)subscribe after every Connected
//!   inputs:   SensorStateTracker ──▶ MqttStatePublisher ──▶ client outbox
//! ```
//!
//! Subscribing is kept off the receive thread: the client's internal task
//! waits for that thread to consume each event, so a blocking subscribe
//! there could deadlock.
//!
//! A `Disconnected` event enqueues a [`DoorRequest::SafetyReset`] so the
//! motor is left idle whenever remote control is lost.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::app::commands::{Command, DoorRequest};
use crate::app::events::{DoorState, StateChannel};
use crate::app::ports::{RequestSink, StatePublisher};
use crate::config::MqttSettings;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

// ───────────────────────────────────────────────────────────────
// Inbound routing
// ───────────────────────────────────────────────────────────────

/// Transport-neutral view of one connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent<'a> {
    Connected,
    Disconnected,
    Received {
        topic: Option<&'a str>,
        payload: &'a [u8],
    },
}

/// Set after every `Connected`; cleared by whoever performs the
/// subscriptions.
static NEEDS_SUBSCRIBE: AtomicBool = AtomicBool::new(false);

/// Inbound router.  Owns the topic names it listens to.
#[derive(Debug, Clone)]
pub struct Gateway {
    command_topic: String,
    state_topic: String,
    reset_on_state_message: bool,
}

impl Gateway {
    pub fn new(settings: &MqttSettings, reset_on_state_message: bool) -> Self {
        Self {
            command_topic: settings.command_topic.clone(),
            state_topic: settings.state_topic.clone(),
            reset_on_state_message,
        }
    }

    /// Topics to subscribe after every (re)connect.
    pub fn subscriptions(&self) -> Vec<&str> {
        let mut topics = vec![self.command_topic.as_str()];
        if self.reset_on_state_message {
            topics.push(self.state_topic.as_str());
        }
        topics
    }

    /// Map one inbound message to a request.  Unknown topics and malformed
    /// payloads are logged and dropped.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<DoorRequest> {
        if topic == self.command_topic {
            match Command::parse(payload) {
                Some(command) => {
                    info!("mqtt: command {} on '{}'", command, topic);
                    Some(DoorRequest::remote(command))
                }
                None => {
                    warn!(
                        "mqtt: ignoring malformed command {:?} on '{}'",
                        String::from_utf8_lossy(payload),
                        topic
                    );
                    None
                }
            }
        } else if self.reset_on_state_message && topic == self.state_topic {
            info!(
                "mqtt: state message {:?}, resetting motor outputs",
                String::from_utf8_lossy(payload)
            );
            Some(DoorRequest::SafetyReset)
        } else {
            debug!("mqtt: ignoring message on '{}'", topic);
            None
        }
    }

    /// Handle one connection event, forwarding any request into `sink`.
    pub fn handle(&self, event: GatewayEvent<'_>, sink: &mut impl RequestSink) {
        match event {
            GatewayEvent::Connected => {
                info!("mqtt: connected");
                NEEDS_SUBSCRIBE.store(true, Ordering::Release);
            }
            GatewayEvent::Disconnected => {
                warn!("mqtt: disconnected, requesting safety reset");
                sink.submit(DoorRequest::SafetyReset);
            }
            GatewayEvent::Received {
                topic: Some(topic),
                payload,
            } => {
                if let Some(request) = self.route(topic, payload) {
                    sink.submit(request);
                }
            }
            GatewayEvent::Received { topic: None, .. } => {
                // Continuation chunk of a fragmented message; commands are
                // a few bytes, so anything fragmented is not ours.
                debug!("mqtt: ignoring fragment");
            }
        }
    }
}

/// Consume a pending subscribe request.
pub fn take_subscribe_request() -> bool {
    NEEDS_SUBSCRIBE.swap(false, Ordering::AcqRel)
}

// ───────────────────────────────────────────────────────────────
// Outbound publishing
// ───────────────────────────────────────────────────────────────

/// Minimal outbox interface so the publisher is testable off-target.
pub trait MqttOutbox {
    fn enqueue(&mut self, topic: &str, retain: bool, payload: &[u8]) -> Result<(), CommsError>;
}

/// [`StatePublisher`] onto the two state topics.
pub struct MqttStatePublisher<T: MqttOutbox> {
    outbox: T,
    state_topic: String,
    realtime_topic: String,
    failures: u32,
}

impl<T: MqttOutbox> MqttStatePublisher<T> {
    pub fn new(outbox: T, settings: &MqttSettings) -> Self {
        Self {
            outbox,
            state_topic: settings.state_topic.clone(),
            realtime_topic: settings.realtime_topic.clone(),
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn outbox(&self) -> &T {
        &self.outbox
    }
}

impl<T: MqttOutbox> StatePublisher for MqttStatePublisher<T> {
    fn publish(&mut self, channel: StateChannel, state: DoorState) {
        let topic = match channel {
            StateChannel::Realtime => &self.realtime_topic,
            StateChannel::Latched => &self.state_topic,
        };
        match self
            .outbox
            .enqueue(topic, channel.retained(), state.as_token().as_bytes())
        {
            Ok(()) => debug!("mqtt: enqueued {} to '{}'", state, topic),
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                warn!("mqtt: publish {} to '{}' failed: {}", state, topic, e);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

/// Client handle shared by the publisher and the subscriber.
#[cfg(target_os = "espidf")]
pub type SharedClient = Arc<Mutex<EspMqttClient<'static>>>;

#[cfg(target_os = "espidf")]
impl MqttOutbox for SharedClient {
    fn enqueue(&mut self, topic: &str, retain: bool, payload: &[u8]) -> Result<(), CommsError> {
        let mut client = self.lock().map_err(|_| CommsError::MqttPublishFailed)?;
        client
            .enqueue(topic, QoS::AtLeastOnce, retain, payload)
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }
}

/// Create the client.  The broker connection is established in the
/// background; the returned connection must be drained by [`run_receiver`].
#[cfg(target_os = "espidf")]
pub fn connect(settings: &MqttSettings) -> Result<(SharedClient, EspMqttConnection), CommsError> {
    let conf = MqttClientConfiguration {
        client_id: Some(settings.client_id.as_str()),
        username: (!settings.username.is_empty()).then_some(settings.username.as_str()),
        password: (!settings.password.is_empty()).then_some(settings.password.as_str()),
        keep_alive_interval: Some(core::time::Duration::from_secs(30)),
        ..Default::default()
    };
    let (client, connection) = EspMqttClient::new(&settings.broker_url, &conf).map_err(|e| {
        log::error!("mqtt: client init failed: {:?}", e);
        CommsError::MqttConnectFailed
    })?;
    info!("mqtt: client started for {}", settings.broker_url);
    Ok((Arc::new(Mutex::new(client)), connection))
}

/// Drain connection events forever (mqtt-rx thread body).
#[cfg(target_os = "espidf")]
pub fn run_receiver(
    mut connection: EspMqttConnection,
    gateway: Gateway,
    mut sink: impl RequestSink,
) {
    while let Ok(event) = connection.next() {
        let event = match event.payload() {
            EventPayload::Connected(_) => GatewayEvent::Connected,
            EventPayload::Disconnected => GatewayEvent::Disconnected,
            EventPayload::Received { topic, data, .. } => GatewayEvent::Received {
                topic,
                payload: data,
            },
            EventPayload::Error(e) => {
                warn!("mqtt: {:?}", e);
                continue;
            }
            _ => continue,
        };
        gateway.handle(event, &mut sink);
    }
    warn!("mqtt: connection closed, receiver exiting");
}

/// Perform a pending subscribe, if any.  Called from the net thread.
#[cfg(target_os = "espidf")]
pub fn service_subscriptions(client: &SharedClient, gateway: &Gateway) -> Result<(), CommsError> {
    if !take_subscribe_request() {
        return Ok(());
    }
    let mut client = client.lock().map_err(|_| CommsError::MqttSubscribeFailed)?;
    for topic in gateway.subscriptions() {
        if let Err(e) = client.subscribe(topic, QoS::AtLeastOnce) {
            warn!("mqtt: subscribe '{}' failed: {:?}", topic, e);
            NEEDS_SUBSCRIBE.store(true, Ordering::Release);
            return Err(CommsError::MqttSubscribeFailed);
        }
        info!("mqtt: subscribed to '{}'", topic);
    }
    Ok(())
}
