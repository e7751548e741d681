// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{EVENT_CHANNEL_CAPACITY, Transport, TransportEvent};
use crate::error::ProtocolError;

/// A transport that never leaves the process.
///
/// It records every subscription and publish, lets the caller inject
/// [`TransportEvent`]s as if they came from a broker, and can be told to
/// fail requests. Clones share the same state, so a test can keep one
/// handle while the session owns another.
///
/// A reconnect queues [`TransportEvent::Connected`], as a broker would
/// acknowledge the new connection.
///
/// # Examples
///
/// ```
/// use plc_link::protocol::{MemoryTransport, Transport, TransportEvent};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (transport, mut events) = MemoryTransport::new();
///
/// transport.publish("plc/control", "{}".to_string()).await.unwrap();
/// assert_eq!(transport.published(), [("plc/control".to_string(), "{}".to_string())]);
///
/// transport.emit(TransportEvent::Connected).await;
/// assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    events: mpsc::Sender<TransportEvent>,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, String)>>,
    failing_topics: Mutex<HashSet<String>>,
    fail_publish: AtomicBool,
    reconnects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MemoryTransport {
    /// Creates a transport and the queue its events are delivered on.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let inner = MemoryInner {
            events,
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            failing_topics: Mutex::new(HashSet::new()),
            fail_publish: AtomicBool::new(false),
            reconnects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// Injects an event as if it came from the broker.
    ///
    /// Events are dropped once the receiving end is gone.
    pub async fn emit(&self, event: TransportEvent) {
        if self.inner.events.send(event).await.is_err() {
            tracing::trace!("Event queue closed, dropping injected event");
        }
    }

    /// Returns a sender for injecting events from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::Sender<TransportEvent> {
        self.inner.events.clone()
    }

    /// Makes subscriptions to `topic` fail (or succeed again).
    pub fn fail_subscription(&self, topic: impl Into<String>, fail: bool) {
        let topic = topic.into();
        let mut failing = self.inner.failing_topics.lock();
        if fail {
            failing.insert(topic);
        } else {
            failing.remove(&topic);
        }
    }

    /// Makes publishes fail (or succeed again).
    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::Release);
    }

    /// Topics successfully subscribed, in request order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.lock().clone()
    }

    /// `(topic, payload)` pairs successfully published, in request order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, String)> {
        self.inner.published.lock().clone()
    }

    /// Number of reconnect requests.
    #[must_use]
    pub fn reconnect_count(&self) -> usize {
        self.inner.reconnects.load(Ordering::Acquire)
    }

    /// Number of disconnect requests.
    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnects.load(Ordering::Acquire)
    }
}

impl Transport for MemoryTransport {
    async fn subscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        if self.inner.failing_topics.lock().contains(topic) {
            return Err(ProtocolError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "refused by memory transport".to_string(),
            });
        }
        self.inner.subscriptions.lock().push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), ProtocolError> {
        if self.inner.fail_publish.load(Ordering::Acquire) {
            return Err(ProtocolError::ConnectionFailed(
                "memory transport is failing publishes".to_string(),
            ));
        }
        self.inner
            .published
            .lock()
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), ProtocolError> {
        self.inner.reconnects.fetch_add(1, Ordering::AcqRel);
        self.inner
            .events
            .try_send(TransportEvent::Connected)
            .map_err(|e| ProtocolError::ChannelClosed(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), ProtocolError> {
        self.inner.disconnects.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_subscriptions_and_publishes() {
        let (transport, _rx) = MemoryTransport::new();

        transport.subscribe("plc/feedback").await.unwrap();
        transport
            .publish("plc/control", "payload".to_string())
            .await
            .unwrap();

        assert_eq!(transport.subscriptions(), ["plc/feedback"]);
        assert_eq!(transport.published().len(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let (transport, _rx) = MemoryTransport::new();
        transport.fail_subscription("plc/inputs", true);
        transport.fail_publishes(true);

        let err = transport.subscribe("plc/inputs").await.unwrap_err();
        assert!(matches!(err, ProtocolError::SubscribeFailed { .. }));
        assert!(transport.publish("t", String::new()).await.is_err());
        assert!(transport.subscriptions().is_empty());
        assert!(transport.published().is_empty());

        transport.fail_subscription("plc/inputs", false);
        assert!(transport.subscribe("plc/inputs").await.is_ok());
    }

    #[tokio::test]
    async fn reconnect_queues_connected() {
        let (transport, mut rx) = MemoryTransport::new();

        transport.reconnect().await.unwrap();

        assert_eq!(transport.reconnect_count(), 1);
        assert!(matches!(rx.recv().await, Some(TransportEvent::Connected)));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let (transport, _rx) = MemoryTransport::new();
        let handle = transport.clone();

        transport.disconnect().await.unwrap();
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn emit_after_receiver_dropped_is_silent() {
        let (transport, rx) = MemoryTransport::new();
        drop(rx);
        transport.emit(TransportEvent::Disconnected).await;
    }
}
