// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport contract between the session and the message broker.
//!
//! A transport does two things:
//!
//! - it accepts outbound requests through the [`Transport`] trait
//!   (subscribe, publish, reconnect, disconnect) without blocking the caller
//! - it reports everything that happens on the wire as [`TransportEvent`]s
//!   on a single-consumer queue handed out when the transport is created
//!
//! # Implementations
//!
//! - [`MqttTransport`]: a real MQTT connection (rumqttc), behind the `mqtt` feature
//! - [`MemoryTransport`]: an in-process transport that records requests and
//!   lets callers inject events, for tests and demos

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use memory::MemoryTransport;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;

use std::future::Future;

use crate::error::ProtocolError;

/// Capacity of the inbound event queue.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something that happened on the transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The broker accepted the connection.
    Connected,

    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message was published on.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },

    /// The broker refused a subscription.
    SubscriptionRejected {
        /// Topic filter, when it can be matched to the acknowledgement.
        topic: Option<String>,
        /// Failure description.
        reason: String,
    },

    /// The connection failed or was lost.
    Error(ProtocolError),

    /// The connection was closed.
    Disconnected,
}

impl TransportEvent {
    /// Creates a message event.
    #[must_use]
    pub fn message(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::Message {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Outbound half of a transport.
///
/// Every method only enqueues the request; completion and failures that
/// happen later are reported as [`TransportEvent`]s. Errors returned here
/// mean the request could not even be queued.
pub trait Transport: Send + Sync + 'static {
    /// Subscribes to a topic.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request cannot be queued.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Publishes a payload to a topic.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request cannot be queued.
    fn publish(
        &self,
        topic: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Opens a new connection after a disconnect or error.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the new connection cannot be set up.
    fn reconnect(&self) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request cannot be queued.
    fn disconnect(&self) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructor() {
        let event = TransportEvent::message("plc/inputs", "[1,0]");
        let TransportEvent::Message { topic, payload } = event else {
            panic!("expected message");
        };
        assert_eq!(topic, "plc/inputs");
        assert_eq!(payload, b"[1,0]");
    }
}
