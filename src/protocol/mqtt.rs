// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport backed by rumqttc.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode};
use tokio::sync::mpsc;

use super::{EVENT_CHANNEL_CAPACITY, Transport, TransportEvent};
use crate::config::{BrokerConfig, TransportKind};
use crate::error::ProtocolError;

/// Capacity of rumqttc's request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Smallest keep-alive rumqttc accepts.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(1);

/// MQTT connection to the broker.
///
/// A background task polls the rumqttc event loop and turns what it sees
/// into [`TransportEvent`]s. The task stops on the first connection error
/// or disconnect; a new connection is only opened by
/// [`reconnect`](Transport::reconnect).
///
/// All requests use QoS 1 and never wait for the network.
///
/// # Examples
///
/// ```no_run
/// use plc_link::config::BrokerConfig;
/// use plc_link::protocol::{MqttTransport, Transport, TransportEvent};
///
/// # async fn example() -> plc_link::Result<()> {
/// let config = BrokerConfig::builder().host("192.168.1.50").build()?;
/// let (transport, mut events) = MqttTransport::start(&config)?;
///
/// while let Some(event) = events.recv().await {
///     if let TransportEvent::Connected = event {
///         transport.subscribe("plc/feedback").await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MqttTransport {
    inner: Arc<MqttInner>,
}

struct MqttInner {
    config: BrokerConfig,
    client: Mutex<AsyncClient>,
    /// Incremented on every reconnect; pollers of older connections stop
    /// reporting.
    generation: AtomicU64,
    /// Topics awaiting a SUBACK, in request order.
    pending_subscriptions: Mutex<VecDeque<String>>,
    events: mpsc::Sender<TransportEvent>,
}

impl MqttInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Forwards an event from the poller of `generation`.
    ///
    /// Returns `false` if the poller should stop.
    async fn emit(&self, generation: u64, event: TransportEvent) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.events.send(event).await.is_ok()
    }
}

impl MqttTransport {
    /// Starts connecting to the broker.
    ///
    /// Returns immediately; [`TransportEvent::Connected`] is queued once the
    /// broker acknowledges the connection. If that does not happen within
    /// the configured connect timeout, a
    /// [`ProtocolError::Timeout`] is queued instead.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if the configuration cannot be
    /// turned into connection options.
    pub fn start(
        config: &BrokerConfig,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), ProtocolError> {
        let (client, event_loop) = AsyncClient::new(mqtt_options(config)?, REQUEST_CHANNEL_CAPACITY);
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new(MqttInner {
            config: config.clone(),
            client: Mutex::new(client),
            generation: AtomicU64::new(0),
            pending_subscriptions: Mutex::new(VecDeque::new()),
            events,
        });

        tracing::info!(url = %config.url(), client_id = %config.client_id(), "Connecting to MQTT broker");
        spawn_poller(Arc::clone(&inner), event_loop, 0);

        Ok((Self { inner }, rx))
    }

    /// Returns the broker configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    fn client(&self) -> AsyncClient {
        self.inner.client.lock().clone()
    }
}

impl Transport for MqttTransport {
    async fn subscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        let client = self.client();
        self.inner
            .pending_subscriptions
            .lock()
            .push_back(topic.to_string());

        if let Err(e) = client.try_subscribe(topic, QoS::AtLeastOnce) {
            self.inner.pending_subscriptions.lock().pop_back();
            return Err(ProtocolError::SubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::debug!(topic = %topic, "Subscription requested");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, payload = %payload, "Publishing MQTT message");
        self.client()
            .try_publish(topic, QoS::AtLeastOnce, false, payload)?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), ProtocolError> {
        let options = mqtt_options(&self.inner.config)?;
        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.inner.client.lock() = client;
        self.inner.pending_subscriptions.lock().clear();

        tracing::info!(url = %self.inner.config.url(), generation, "Reconnecting to MQTT broker");
        spawn_poller(Arc::clone(&self.inner), event_loop, generation);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(url = %self.inner.config.url(), "Disconnecting from MQTT broker");
        self.client().try_disconnect()?;
        Ok(())
    }
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("url", &self.inner.config.url())
            .field("client_id", &self.inner.config.client_id())
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Builds rumqttc options from the broker configuration.
fn mqtt_options(config: &BrokerConfig) -> Result<MqttOptions, ProtocolError> {
    let client_id = config.client_id();
    if client_id.is_empty() || client_id.starts_with(char::is_whitespace) {
        return Err(ProtocolError::InvalidAddress(format!(
            "invalid client id {client_id:?}"
        )));
    }

    let mut options = match config.transport() {
        TransportKind::Tcp => MqttOptions::new(client_id, config.host(), config.port()),
        TransportKind::Tls => {
            let mut options = MqttOptions::new(client_id, config.host(), config.port());
            options.set_transport(rumqttc::Transport::tls_with_default_config());
            options
        }
        TransportKind::WebSocket | TransportKind::SecureWebSocket => websocket_options(config)?,
    };

    let keep_alive = config.keep_alive();
    if !keep_alive.is_zero() && keep_alive < MIN_KEEP_ALIVE {
        tracing::warn!(?keep_alive, "Keep-alive below one second, using one second");
        options.set_keep_alive(MIN_KEEP_ALIVE);
    } else {
        options.set_keep_alive(keep_alive);
    }
    options.set_clean_session(config.clean_session());

    if let Some((username, password)) = config.credentials() {
        options.set_credentials(username, password);
    }

    Ok(options)
}

/// WebSocket transports take the full URL as host.
#[cfg(feature = "websocket")]
fn websocket_options(config: &BrokerConfig) -> Result<MqttOptions, ProtocolError> {
    let mut options = MqttOptions::new(config.client_id(), config.url(), config.port());
    if config.transport() == TransportKind::SecureWebSocket {
        options.set_transport(rumqttc::Transport::wss_with_default_config());
    } else {
        options.set_transport(rumqttc::Transport::Ws);
    }
    Ok(options)
}

#[cfg(not(feature = "websocket"))]
fn websocket_options(config: &BrokerConfig) -> Result<MqttOptions, ProtocolError> {
    Err(ProtocolError::InvalidAddress(format!(
        "{} requires the `websocket` feature",
        config.url()
    )))
}

fn spawn_poller(inner: Arc<MqttInner>, event_loop: EventLoop, generation: u64) {
    tokio::spawn(async move {
        poll_events(&inner, event_loop, generation).await;
        tracing::debug!(generation, "MQTT event loop stopped");
    });
}

/// Polls until the broker acknowledges the connection.
async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<(), rumqttc::ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(connack)) = event_loop.poll().await? {
            tracing::debug!(?connack, "MQTT broker connected");
            return Ok(());
        }
    }
}

async fn poll_events(inner: &MqttInner, mut event_loop: EventLoop, generation: u64) {
    let timeout = inner.config.connect_timeout();
    let event = match tokio::time::timeout(timeout, wait_for_connack(&mut event_loop)).await {
        Ok(Ok(())) => TransportEvent::Connected,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "MQTT connection failed");
            TransportEvent::Error(ProtocolError::ConnectionFailed(e.to_string()))
        }
        Err(_) => {
            let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::error!(timeout_ms = millis, "MQTT connection timed out");
            TransportEvent::Error(ProtocolError::Timeout(millis))
        }
    };
    let connected = matches!(event, TransportEvent::Connected);
    if !inner.emit(generation, event).await || !connected {
        return;
    }

    loop {
        let event = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(topic = %publish.topic, bytes = publish.payload.len(), "MQTT message received");
                TransportEvent::Message {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                let mut rejected = None;
                for code in &suback.return_codes {
                    let topic = inner.pending_subscriptions.lock().pop_front();
                    if matches!(code, SubscribeReasonCode::Failure) {
                        rejected = Some(TransportEvent::SubscriptionRejected {
                            topic,
                            reason: "broker refused the subscription".to_string(),
                        });
                    } else {
                        tracing::debug!(topic = ?topic, "MQTT subscription acknowledged");
                    }
                }
                match rejected {
                    Some(event) => event,
                    None => continue,
                }
            }
            Ok(Event::Incoming(Packet::Disconnect) | Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!("MQTT connection closed");
                inner.emit(generation, TransportEvent::Disconnected).await;
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                let error = ProtocolError::ConnectionFailed(e.to_string());
                inner.emit(generation, TransportEvent::Error(error)).await;
                return;
            }
        };

        if !inner.emit(generation, event).await {
            return;
        }
    }
}
