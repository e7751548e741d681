// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle management.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::config::Topics;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::Transport;
use crate::types::ConnectionStatus;

/// Owns the transport and the connection status.
///
/// The status only moves along the edges allowed by
/// [`ConnectionStatus::can_transition_to`]. A subscription failure does not
/// change the status; it marks the connection as degraded until the next
/// complete subscription round.
#[derive(Debug)]
pub struct ConnectionManager<T> {
    transport: T,
    topics: Topics,
    status: RwLock<ConnectionStatus>,
    degraded: AtomicBool,
    closed: AtomicBool,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a manager in the `Connecting` state.
    #[must_use]
    pub fn new(transport: T, topics: Topics) -> Self {
        Self {
            transport,
            topics,
            status: RwLock::new(ConnectionStatus::Connecting),
            degraded: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Moves to `next`, returning the previous status.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` if the edge is not allowed; the
    /// status is left unchanged.
    pub fn transition(&self, next: ConnectionStatus) -> Result<ConnectionStatus> {
        let mut status = self.status.write();
        let previous = *status;
        if !previous.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        *status = next;
        Ok(previous)
    }

    /// Subscribes to the feedback and inputs topics.
    ///
    /// Returns the failures; an empty list means the subscription round
    /// succeeded and clears any earlier degradation.
    pub async fn subscribe_all(&self) -> Vec<ProtocolError> {
        let mut failures = Vec::new();
        for topic in self.topics.subscriptions() {
            match self.transport.subscribe(topic).await {
                Ok(()) => tracing::debug!(topic = %topic, "Subscribed"),
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Subscription failed");
                    failures.push(e);
                }
            }
        }
        self.degraded.store(!failures.is_empty(), Ordering::Release);
        failures
    }

    /// Marks the subscriptions as incomplete.
    pub fn mark_degraded(&self) {
        self.degraded.store(true, Ordering::Release);
    }

    /// Returns `true` if connected with every subscription in place.
    #[must_use]
    pub fn is_fully_subscribed(&self) -> bool {
        self.status().is_connected() && !self.degraded.load(Ordering::Acquire)
    }

    /// Moves to `Connecting` ahead of an external reconnect.
    ///
    /// Returns the previous status. The caller then asks the transport for
    /// a new connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionClosed` after [`close`](Self::close), or
    /// `Error::InvalidTransition` unless the status is `Disconnected` or
    /// `Error`.
    pub fn begin_reconnect(&self) -> Result<ConnectionStatus> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        let previous = self.status();
        if !previous.can_reconnect() {
            return Err(Error::InvalidTransition {
                from: previous,
                to: ConnectionStatus::Connecting,
            });
        }
        self.transition(ConnectionStatus::Connecting)
    }

    /// Closes the transport.
    ///
    /// Only the first call reaches the transport; it returns `true`, every
    /// later call returns `false`.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.transport.disconnect().await {
            tracing::warn!(error = %e, "Transport did not close cleanly");
        }
        true
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryTransport;

    fn manager() -> (ConnectionManager<MemoryTransport>, MemoryTransport) {
        let (transport, _rx) = MemoryTransport::new();
        let handle = transport.clone();
        (ConnectionManager::new(transport, Topics::default()), handle)
    }

    #[test]
    fn starts_connecting() {
        let (manager, _) = manager();
        assert_eq!(manager.status(), ConnectionStatus::Connecting);
        assert!(!manager.is_fully_subscribed());
    }

    #[test]
    fn transition_returns_previous() {
        let (manager, _) = manager();
        let previous = manager.transition(ConnectionStatus::Connected).unwrap();
        assert_eq!(previous, ConnectionStatus::Connecting);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn invalid_transition_leaves_status() {
        let (manager, _) = manager();
        manager.transition(ConnectionStatus::Connected).unwrap();

        let err = manager
            .transition(ConnectionStatus::Connecting)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: ConnectionStatus::Connected,
                to: ConnectionStatus::Connecting
            }
        ));
        assert_eq!(manager.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn subscribe_all_covers_both_topics() {
        let (manager, transport) = manager();
        manager.transition(ConnectionStatus::Connected).unwrap();

        let failures = manager.subscribe_all().await;

        assert!(failures.is_empty());
        assert_eq!(transport.subscriptions(), ["plc/feedback", "plc/inputs"]);
        assert!(manager.is_fully_subscribed());
    }

    #[tokio::test]
    async fn subscription_failure_degrades() {
        let (manager, transport) = manager();
        manager.transition(ConnectionStatus::Connected).unwrap();
        transport.fail_subscription("plc/inputs", true);

        let failures = manager.subscribe_all().await;

        assert_eq!(failures.len(), 1);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert!(!manager.is_fully_subscribed());

        transport.fail_subscription("plc/inputs", false);
        assert!(manager.subscribe_all().await.is_empty());
        assert!(manager.is_fully_subscribed());
    }

    #[test]
    fn reconnect_only_from_disconnected_or_error() {
        let (manager, _) = manager();
        assert!(matches!(
            manager.begin_reconnect(),
            Err(Error::InvalidTransition { .. })
        ));

        manager.transition(ConnectionStatus::Error).unwrap();
        assert_eq!(manager.begin_reconnect().unwrap(), ConnectionStatus::Error);
        assert_eq!(manager.status(), ConnectionStatus::Connecting);
    }

    #[tokio::test]
    async fn close_runs_once() {
        let (manager, transport) = manager();

        assert!(manager.close().await);
        assert!(!manager.close().await);
        assert!(manager.is_closed());
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn reconnect_after_close_is_rejected() {
        let (manager, _) = manager();
        manager.transition(ConnectionStatus::Disconnected).unwrap();
        manager.close().await;

        assert!(matches!(manager.begin_reconnect(), Err(Error::SessionClosed)));
    }
}
