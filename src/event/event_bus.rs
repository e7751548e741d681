// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast of session events.

use tokio::sync::broadcast;

use super::SyncEvent;

/// Events buffered per receiver before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of [`SyncEvent`]s to any number of receivers.
///
/// Receivers only see events published after they subscribed. A receiver
/// that falls more than 256 events behind gets `RecvError::Lagged` and
/// resumes with the most recent ones; the session never waits for it.
///
/// # Examples
///
/// ```
/// use plc_link::event::{EventBus, SyncEvent};
/// use plc_link::types::ConnectionStatus;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SyncEvent::status_changed(
///     ConnectionStatus::Connecting,
///     ConnectionStatus::Connected,
/// ));
/// assert!(rx.try_recv().unwrap().is_status_change());
/// ```
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Creates a bus with no receivers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends an event to every live receiver.
    ///
    /// Events published while nobody listens are dropped.
    pub fn publish(&self, event: SyncEvent) {
        if self.subscriber_count() == 0 {
            tracing::trace!(event = event.label(), "No event receivers");
            return;
        }
        // Receivers can drop between the count and the send.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
