// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport connection status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection status of a session.
///
/// ```text
///  Connecting ──► Connected ──► Disconnected ─┐
///      │  │            │                      │ reconnect()
///      │  └────────────┴──────► Error ────────┤
///      ▲                                      │
///      └──────────────────────────────────────┘
/// ```
///
/// `Connecting` may also fall straight to `Disconnected`, and `Error`
/// moves to `Disconnected` when the session is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Waiting for the broker to acknowledge the connection.
    #[default]
    Connecting,
    /// Connected and able to publish commands.
    Connected,
    /// The connection was closed.
    Disconnected,
    /// The transport reported an error.
    Error,
}

impl ConnectionStatus {
    /// Returns `true` if commands may be dispatched.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if an external reconnect is allowed from this status.
    #[must_use]
    pub const fn can_reconnect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }

    /// Returns `true` if the status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Connecting,
                Self::Connected | Self::Error | Self::Disconnected
            ) | (Self::Connected, Self::Disconnected | Self::Error)
                | (Self::Disconnected | Self::Error, Self::Connecting)
                | (Self::Error, Self::Disconnected)
        )
    }

    /// Returns the display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_connecting() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Connecting);
    }

    #[test]
    fn forward_transitions() {
        use ConnectionStatus::*;
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Error));
        assert!(Connected.can_transition_to(Disconnected));
        assert!(Connected.can_transition_to(Error));
        assert!(Error.can_transition_to(Disconnected));
    }

    #[test]
    fn reconnect_only_from_terminal_states() {
        use ConnectionStatus::*;
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Error.can_transition_to(Connecting));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(Disconnected.can_reconnect());
        assert!(!Connecting.can_reconnect());
    }

    #[test]
    fn rejected_transitions() {
        use ConnectionStatus::*;
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Error.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Error));
    }

    #[test]
    fn display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "Connected");
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Error.is_connected());
    }
}
