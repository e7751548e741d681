// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session event types.

use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::state::{StateChange, StateSnapshot};
use crate::types::ConnectionStatus;

/// Events broadcast by a session.
///
/// # Examples
///
/// ```
/// use plc_link::event::SyncEvent;
/// use plc_link::types::ConnectionStatus;
///
/// let event = SyncEvent::status_changed(ConnectionStatus::Connecting, ConnectionStatus::Connected);
/// assert!(event.is_status_change());
/// ```
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// An inbound payload changed the state.
    StateChanged {
        /// The values that moved.
        change: StateChange,
        /// The complete state after the change.
        snapshot: Arc<StateSnapshot>,
    },

    /// The connection status changed.
    StatusChanged {
        /// Status before the transition.
        previous: ConnectionStatus,
        /// Status after the transition.
        current: ConnectionStatus,
    },

    /// A failure was contained and reported.
    Error {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl SyncEvent {
    /// Creates a state change event.
    #[must_use]
    pub fn state_changed(change: StateChange, snapshot: Arc<StateSnapshot>) -> Self {
        Self::StateChanged { change, snapshot }
    }

    /// Creates a status change event.
    #[must_use]
    pub fn status_changed(previous: ConnectionStatus, current: ConnectionStatus) -> Self {
        Self::StatusChanged { previous, current }
    }

    /// Creates an error event from a reported error.
    #[must_use]
    pub fn error(error: &Error) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::StatusChanged { .. } => "status_changed",
            Self::Error { .. } => "error",
        }
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns `true` if this is a status change event.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        matches!(self, Self::StatusChanged { .. })
    }

    /// Returns `true` if this is an error event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
