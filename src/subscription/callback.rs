// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for session notifications.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::Error;
use crate::state::StateChange;
use crate::types::ConnectionStatus;

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and can be used to
/// unsubscribe later. IDs are unique within a session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for output callbacks.
type OutputCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Type alias for input callbacks.
type InputCallback = Arc<dyn Fn(usize, bool) + Send + Sync>;

/// Type alias for generic state change callbacks.
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Type alias for connection status callbacks.
type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Type alias for error callbacks.
type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Registry for managing session callbacks.
///
/// It uses thread-safe interior mutability via `parking_lot::RwLock`, so
/// callbacks can be registered from any task while the event loop
/// dispatches.
///
/// Callbacks run synchronously on the dispatching task and must not block.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Per-output change callbacks.
    output_callbacks: RwLock<HashMap<SubscriptionId, OutputCallback>>,
    /// Per-input change callbacks.
    input_callbacks: RwLock<HashMap<SubscriptionId, InputCallback>>,
    /// Generic state change callbacks (one call per mutation).
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    /// Connection status callbacks.
    status_callbacks: RwLock<HashMap<SubscriptionId, StatusCallback>>,
    /// Error report callbacks.
    error_callbacks: RwLock<HashMap<SubscriptionId, ErrorCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            output_callbacks: RwLock::new(HashMap::new()),
            input_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            status_callbacks: RwLock::new(HashMap::new()),
            error_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for output changes.
    ///
    /// The callback receives the output key and its new value.
    pub fn on_output_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.output_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for input changes.
    ///
    /// The callback receives the zero-based input index and its new value.
    pub fn on_input_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(usize, bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.input_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for every state mutation.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for connection status changes.
    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for error reports.
    pub fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.error_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.output_callbacks.write().remove(&id).is_some()
            || self.input_callbacks.write().remove(&id).is_some()
            || self.state_changed_callbacks.write().remove(&id).is_some()
            || self.status_callbacks.write().remove(&id).is_some()
            || self.error_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.output_callbacks.write().clear();
        self.input_callbacks.write().clear();
        self.state_changed_callbacks.write().clear();
        self.status_callbacks.write().clear();
        self.error_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches a state change.
    ///
    /// Generic callbacks receive the change once, as applied. Output and
    /// input callbacks are called once per changed value, batches included.
    pub fn dispatch(&self, change: &StateChange) {
        for callback in snapshot(&self.state_changed_callbacks) {
            callback(change);
        }
        self.dispatch_value(change);
    }

    fn dispatch_value(&self, change: &StateChange) {
        match change {
            StateChange::Output { key, value } => {
                for callback in snapshot(&self.output_callbacks) {
                    callback(key, *value);
                }
            }
            StateChange::Input { index, value } => {
                for callback in snapshot(&self.input_callbacks) {
                    callback(*index, *value);
                }
            }
            StateChange::Batch(changes) => {
                for nested_change in changes {
                    self.dispatch_value(nested_change);
                }
            }
        }
    }

    /// Dispatches a connection status change.
    pub fn dispatch_status(&self, status: ConnectionStatus) {
        for callback in snapshot(&self.status_callbacks) {
            callback(status);
        }
    }

    /// Dispatches an error report.
    pub fn dispatch_error(&self, error: &Error) {
        for callback in snapshot(&self.error_callbacks) {
            callback(error);
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.output_callbacks.read().len()
            + self.input_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
            + self.status_callbacks.read().len()
            + self.error_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

/// Copies the callbacks out so none of them runs under the lock; a callback
/// may register or unsubscribe.
fn snapshot<C: Clone>(callbacks: &RwLock<HashMap<SubscriptionId, C>>) -> Vec<C> {
    callbacks.read().values().cloned().collect()
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
