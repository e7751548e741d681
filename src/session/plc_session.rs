// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The synchronization session.

use std::sync::Arc;

use tokio::sync::{Notify, broadcast, mpsc};

use crate::command::ControlCommand;
use crate::config::{SessionConfig, SignalLayout, Topics};
use crate::decoder::{self, Decoded, FeedbackPayload};
use crate::error::{Error, ErrorKind, ProtocolError, Result};
use crate::event::{EventBus, SyncEvent};
use crate::protocol::{Transport, TransportEvent};
use crate::state::{InputVector, OutputState, StateChange, StateSnapshot, StateStore};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::ConnectionStatus;

use super::{CommandDispatcher, ConnectionManager};

/// Keeps a local view of the PLC signals in sync with the controller.
///
/// The session ties the pieces together:
///
/// - inbound [`TransportEvent`]s are handled one at a time by
///   [`run`](Self::run) or [`handle_event`](Self::handle_event), which is the
///   only path that writes the state store
/// - the read interface ([`output_state`](Self::output_state),
///   [`input_vector`](Self::input_vector), [`snapshot`](Self::snapshot), ...)
///   never blocks on the network
/// - [`request_toggle`](Self::request_toggle) publishes a control command
///   but leaves the state alone until the controller reports back
///
/// Every contained failure is logged, passed to the `on_error` callbacks
/// and broadcast as [`SyncEvent::Error`], exactly once.
///
/// # Examples
///
/// ```
/// use plc_link::config::{BrokerConfig, SessionConfig};
/// use plc_link::protocol::{MemoryTransport, TransportEvent};
/// use plc_link::session::PlcSession;
/// use plc_link::types::ConnectionStatus;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> plc_link::Result<()> {
/// let broker = BrokerConfig::builder().host("localhost").build()?;
/// let (transport, _events) = MemoryTransport::new();
/// let session = PlcSession::new(SessionConfig::new(broker), transport.clone());
///
/// session.handle_event(TransportEvent::Connected).await;
/// session
///     .handle_event(TransportEvent::message("plc/feedback", r#"{"M21":1}"#))
///     .await;
///
/// assert_eq!(session.connection_status(), ConnectionStatus::Connected);
/// assert_eq!(session.output_state().get("M21"), Some(true));
///
/// let cmd = session.request_toggle("M21").await?;
/// assert_eq!(cmd.payload(), r#"{"output":"M21","value":"OFF"}"#);
/// // Unchanged until the controller confirms.
/// assert_eq!(session.output_state().get("M21"), Some(true));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PlcSession<T> {
    layout: SignalLayout,
    topics: Topics,
    store: StateStore,
    connection: ConnectionManager<T>,
    dispatcher: CommandDispatcher,
    callbacks: CallbackRegistry,
    events: EventBus,
    shutdown_signal: Notify,
}

impl<T: Transport> PlcSession<T> {
    /// Creates a session over an already started transport.
    ///
    /// The state starts all-off and the status `Connecting`.
    #[must_use]
    pub fn new(config: SessionConfig, transport: T) -> Self {
        let layout = config.layout().clone();
        let topics = config.topics().clone();
        Self {
            store: StateStore::new(&layout),
            connection: ConnectionManager::new(transport, topics.clone()),
            dispatcher: CommandDispatcher::new(&topics),
            callbacks: CallbackRegistry::new(),
            events: EventBus::new(),
            shutdown_signal: Notify::new(),
            layout,
            topics,
        }
    }

    // =========================================================================
    // Read interface
    // =========================================================================

    /// Returns the current output values.
    #[must_use]
    pub fn output_state(&self) -> OutputState {
        self.store.outputs()
    }

    /// Returns the current input values.
    #[must_use]
    pub fn input_vector(&self) -> InputVector {
        self.store.inputs()
    }

    /// Returns the current connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Returns a consistent view of outputs and inputs.
    #[must_use]
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.store.snapshot()
    }

    /// Returns `true` if connected with both topics subscribed.
    #[must_use]
    pub fn is_fully_subscribed(&self) -> bool {
        self.connection.is_fully_subscribed()
    }

    /// Returns `true` once the session has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Subscribes to the session's event stream.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns the signal layout.
    #[must_use]
    pub fn layout(&self) -> &SignalLayout {
        &self.layout
    }

    /// Returns the topics.
    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        self.connection.transport()
    }

    // =========================================================================
    // Write interface
    // =========================================================================

    /// Asks the controller to flip an output.
    ///
    /// Publishes `{"output":"<key>","value":"ON"|"OFF"}` with the inverse
    /// of the currently displayed value. The state store is not touched.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandRejected` if the session is not connected,
    /// `Error::UnknownOutput` for a key outside the layout, or
    /// `Error::Protocol` if the transport refuses the publish. The same
    /// error is also reported through `on_error` and the event stream.
    pub async fn request_toggle(&self, key: &str) -> Result<ControlCommand> {
        let status = self.connection.status();
        let result = match self.dispatcher.prepare_toggle(key, &self.store, status) {
            Ok(command) => self
                .dispatcher
                .dispatch(self.connection.transport(), &command)
                .await
                .map(|()| command),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a new connection after a disconnect or error.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` unless the status is
    /// `Disconnected` or `Error`, `Error::SessionClosed` after shutdown, or
    /// `Error::Protocol` if the transport cannot start a new connection (the
    /// status then moves to `Error`).
    pub async fn reconnect(&self) -> Result<()> {
        let previous = self.connection.begin_reconnect()?;
        tracing::info!(from = %previous, "Reconnecting");
        self.notify_status(previous, ConnectionStatus::Connecting);

        if let Err(e) = self.connection.transport().reconnect().await {
            self.set_status(ConnectionStatus::Error);
            let error = Error::from(e);
            self.report_error(&error);
            return Err(error);
        }
        Ok(())
    }

    /// Shuts the session down.
    ///
    /// Freezes the state, closes the transport and reports `Disconnected`.
    /// Events handled afterwards are dropped. Only the first call does
    /// anything; it returns `true`.
    pub async fn shutdown(&self) -> bool {
        self.store.seal();
        if !self.connection.close().await {
            return false;
        }
        self.set_status(ConnectionStatus::Disconnected);
        self.shutdown_signal.notify_one();
        tracing::info!("Session shut down");
        true
    }

    // =========================================================================
    // Inbound events
    // =========================================================================

    /// Handles inbound events until the queue closes or the session is
    /// shut down.
    pub async fn run(&self, mut events: mpsc::Receiver<TransportEvent>) {
        while !self.is_closed() {
            tokio::select! {
                () = self.shutdown_signal.notified() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Event loop finished");
    }

    /// Spawns [`run`](Self::run) on the tokio runtime.
    pub fn spawn(self: &Arc<Self>, events: mpsc::Receiver<TransportEvent>) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.run(events).await })
    }

    /// Handles one inbound event.
    pub async fn handle_event(&self, event: TransportEvent) {
        if self.is_closed() {
            tracing::trace!(?event, "Session closed, dropping event");
            return;
        }

        match event {
            TransportEvent::Connected => {
                if self.set_status(ConnectionStatus::Connected) {
                    tracing::info!("Connected");
                    for failure in self.connection.subscribe_all().await {
                        self.report_error(&Error::from(failure));
                    }
                }
            }
            TransportEvent::Message { topic, payload } => {
                self.handle_message(&topic, &payload);
            }
            TransportEvent::SubscriptionRejected { topic, reason } => {
                self.connection.mark_degraded();
                let error = ProtocolError::SubscribeFailed {
                    topic: topic.unwrap_or_else(|| "<unknown>".to_string()),
                    reason,
                };
                self.report_error(&Error::from(error));
            }
            TransportEvent::Error(e) => {
                self.set_status(ConnectionStatus::Error);
                self.report_error(&Error::from(e));
            }
            TransportEvent::Disconnected => {
                if self.set_status(ConnectionStatus::Disconnected) {
                    tracing::info!("Disconnected");
                }
            }
        }
    }

    fn handle_message(&self, topic: &str, payload: &[u8]) {
        let Some(class) = self.topics.classify(topic) else {
            tracing::trace!(topic = %topic, "Ignoring message on unknown topic");
            return;
        };
        tracing::debug!(topic = %topic, bytes = payload.len(), "Message received");

        let applied = decoder::decode(class, topic, payload, &self.layout)
            .map_err(Error::from)
            .and_then(|decoded| self.apply(decoded));

        match applied {
            Ok(Some(change)) => {
                tracing::debug!(topic = %topic, changes = change.change_count(), "State updated");
                self.callbacks.dispatch(&change);
                self.events
                    .publish(SyncEvent::state_changed(change, self.store.snapshot()));
            }
            Ok(None) => tracing::trace!(topic = %topic, "Payload changed nothing"),
            Err(e) => self.report_error(&e),
        }
    }

    fn apply(&self, decoded: Decoded) -> Result<Option<StateChange>> {
        match decoded {
            Decoded::Feedback(FeedbackPayload::ObjectPatch(patch)) => {
                self.store.apply_output_patch(&patch)
            }
            Decoded::Feedback(FeedbackPayload::ArrayReplace(values)) => {
                self.store.replace_outputs(&values)
            }
            Decoded::Feedback(FeedbackPayload::StringReplace(value)) => {
                self.store.replace_outputs(&[value])
            }
            Decoded::Inputs(inputs) => self.store.replace_inputs(inputs),
        }
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Moves to `next` and notifies; invalid transitions are logged and
    /// ignored. Returns whether the status changed.
    fn set_status(&self, next: ConnectionStatus) -> bool {
        match self.connection.transition(next) {
            Ok(previous) => {
                self.notify_status(previous, next);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring status transition");
                false
            }
        }
    }

    fn notify_status(&self, previous: ConnectionStatus, current: ConnectionStatus) {
        tracing::debug!(from = %previous, to = %current, "Status changed");
        self.callbacks.dispatch_status(current);
        self.events
            .publish(SyncEvent::status_changed(previous, current));
    }

    fn report_error(&self, error: &Error) {
        if error.kind() == ErrorKind::Transport {
            tracing::error!(error = %error, "Transport failure");
        } else {
            tracing::warn!(kind = ?error.kind(), error = %error, "Contained failure");
        }
        self.callbacks.dispatch_error(error);
        self.events.publish(SyncEvent::error(error));
    }
}

#[cfg(feature = "mqtt")]
impl PlcSession<crate::protocol::MqttTransport> {
    /// Starts an MQTT connection and creates a session over it.
    ///
    /// Returns the session and the event queue to pass to
    /// [`run`](Self::run) or [`spawn`](Self::spawn). Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the broker configuration cannot be used.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use plc_link::config::{BrokerConfig, SessionConfig};
    /// use plc_link::session::PlcSession;
    ///
    /// # async fn example() -> plc_link::Result<()> {
    /// let config = SessionConfig::new(BrokerConfig::from_env()?);
    /// let (session, events) = PlcSession::connect(config)?;
    /// let session = Arc::new(session);
    /// session.spawn(events);
    /// # Ok(())
    /// # }
    /// ```
    pub fn connect(config: SessionConfig) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let (transport, events) = crate::protocol::MqttTransport::start(config.broker())?;
        Ok((Self::new(config, transport), events))
    }
}

impl<T: Transport> Subscribable for PlcSession<T> {
    fn on_output_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.callbacks.on_output_changed(callback)
    }

    fn on_input_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(usize, bool) + Send + Sync + 'static,
    {
        self.callbacks.on_input_changed(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.callbacks.on_state_changed(callback)
    }

    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.callbacks.on_status_changed(callback)
    }

    fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.callbacks.on_error(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}
