// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that push session notifications.

use crate::error::Error;
use crate::state::StateChange;
use crate::subscription::SubscriptionId;
use crate::types::ConnectionStatus;

/// Trait for types that support event subscriptions.
///
/// Callbacks are invoked synchronously on the task that handles inbound
/// events, after the state store has been updated.
///
/// # Examples
///
/// ```
/// use plc_link::config::{BrokerConfig, SessionConfig};
/// use plc_link::protocol::MemoryTransport;
/// use plc_link::session::PlcSession;
/// use plc_link::subscription::Subscribable;
///
/// let broker = BrokerConfig::builder().host("localhost").build().unwrap();
/// let (transport, _events) = MemoryTransport::new();
/// let session = PlcSession::new(SessionConfig::new(broker), transport);
///
/// let sub_id = session.on_output_changed(|key, value| {
///     println!("{key} is now {}", if value { "ON" } else { "OFF" });
/// });
///
/// assert!(session.unsubscribe(sub_id));
/// ```
pub trait Subscribable {
    /// Subscribes to output changes.
    ///
    /// The callback receives the output key and its new value.
    fn on_output_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, bool) + Send + Sync + 'static;

    /// Subscribes to input changes.
    ///
    /// The callback receives the zero-based input index and its new value.
    fn on_input_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(usize, bool) + Send + Sync + 'static;

    /// Subscribes to all state changes.
    ///
    /// The callback is called once per applied payload that changed
    /// anything.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Subscribes to connection status changes.
    fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static;

    /// Subscribes to error reports.
    ///
    /// Every contained failure (decode, transport, rejected command) is
    /// reported here exactly once.
    fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Error) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
