// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `plc_link` library.
//!
//! The hierarchy mirrors the three ways the synchronization core can fail:
//! inbound payloads that cannot be decoded, transport failures, and user
//! commands that cannot be dispatched. None of them is fatal; the session
//! contains each one at its origin and turns it into a log line, a status
//! change or an error report.

use thiserror::Error;

use crate::types::ConnectionStatus;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// An inbound payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A toggle was requested while the session was not connected.
    #[error("command for {output} rejected: session is {status}")]
    CommandRejected {
        /// The output the user tried to toggle.
        output: String,
        /// The connection status at the time of the request.
        status: ConnectionStatus,
    },

    /// The output key is not part of the configured layout.
    #[error("unknown output: {0}")]
    UnknownOutput(String),

    /// A full replace did not carry exactly one value per signal.
    #[error("expected {expected} values, got {actual}")]
    LengthMismatch {
        /// Number of configured signals.
        expected: usize,
        /// Number of values provided.
        actual: usize,
    },

    /// The connection status cannot move to the requested state.
    #[error("cannot go from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ConnectionStatus,
        /// Requested status.
        to: ConnectionStatus,
    },

    /// The session has been shut down.
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    /// Classifies this error for reporting.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::Protocol(_) => ErrorKind::Transport,
            Self::Config(_) => ErrorKind::Config,
            Self::CommandRejected { .. } => ErrorKind::CommandRejected,
            Self::UnknownOutput(_)
            | Self::LengthMismatch { .. }
            | Self::InvalidTransition { .. }
            | Self::SessionClosed => ErrorKind::Usage,
        }
    }
}

/// Coarse classification of reported errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Malformed, short or wrongly typed inbound payload.
    Decode,
    /// Connection or protocol failure.
    Transport,
    /// Toggle attempted while not connected.
    CommandRejected,
    /// Invalid configuration.
    Config,
    /// Invalid use of the API (unknown key, closed session, ...).
    Usage,
}

/// Errors related to value parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The string is not a known signal state.
    #[error("invalid signal state: {0}")]
    InvalidSignalState(String),
}

/// Errors produced while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid UTF-8.
    #[error("payload on {topic} is not valid UTF-8")]
    InvalidUtf8 {
        /// Topic the payload arrived on.
        topic: String,
    },

    /// The payload is not valid JSON.
    #[error("malformed JSON on {topic}: {source}")]
    Json {
        /// Topic the payload arrived on.
        topic: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The JSON value has a shape this topic does not accept.
    #[error("unexpected {found} on {topic}")]
    UnexpectedShape {
        /// Topic the payload arrived on.
        topic: String,
        /// Short description of what was found.
        found: &'static str,
    },

    /// An object payload names an output that is not configured.
    #[error("unknown output {key} on {topic}")]
    UnknownOutput {
        /// Topic the payload arrived on.
        topic: String,
        /// The offending key.
        key: String,
    },

    /// An element is neither `1`/`true` nor `0`/`false`.
    #[error("invalid value {value} for {element} on {topic}")]
    InvalidValue {
        /// Topic the payload arrived on.
        topic: String,
        /// Output key or array position.
        element: String,
        /// The offending JSON value.
        value: String,
    },

    /// An array payload carries fewer values than configured signals.
    #[error("{topic} carries {actual} values, at least {expected} required")]
    TooShort {
        /// Topic the payload arrived on.
        topic: String,
        /// Minimum number of values.
        expected: usize,
        /// Number of values received.
        actual: usize,
    },

    /// A bare `ON`/`OFF` string arrived while several outputs are configured.
    #[error("bare state string on {topic} is ambiguous with {outputs} outputs")]
    AmbiguousString {
        /// Topic the payload arrived on.
        topic: String,
        /// Number of configured outputs.
        outputs: usize,
    },
}

/// Errors related to the transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The MQTT client rejected a request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The connection failed or was lost.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker did not acknowledge the connection in time.
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    /// A subscription could not be issued or was refused by the broker.
    #[error("subscription to {topic} failed: {reason}")]
    SubscribeFailed {
        /// Topic filter of the subscription.
        topic: String,
        /// Failure description.
        reason: String,
    },

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The layout has no outputs.
    #[error("at least one output must be configured")]
    NoOutputs,

    /// The same output key is listed twice.
    #[error("duplicate output key: {0}")]
    DuplicateOutput(String),

    /// An output key is empty.
    #[error("output keys must not be empty")]
    EmptyOutputKey,

    /// The broker host is missing.
    #[error("broker host is required")]
    MissingHost,

    /// Two topics share the same name.
    #[error("topic {0} is used for more than one channel")]
    TopicClash(String),

    /// An environment variable holds an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Value found.
        value: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_rejected_display() {
        let err = Error::CommandRejected {
            output: "M21".to_string(),
            status: ConnectionStatus::Disconnected,
        };
        assert_eq!(
            err.to_string(),
            "command for M21 rejected: session is Disconnected"
        );
        assert_eq!(err.kind(), ErrorKind::CommandRejected);
    }

    #[test]
    fn error_from_decode_error() {
        let decode = DecodeError::TooShort {
            topic: "plc/inputs".to_string(),
            expected: 8,
            actual: 3,
        };
        let err: Error = decode.into();
        assert!(matches!(err, Error::Decode(DecodeError::TooShort { .. })));
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn too_short_display() {
        let err = DecodeError::TooShort {
            topic: "plc/inputs".to_string(),
            expected: 8,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "plc/inputs carries 3 values, at least 8 required"
        );
    }

    #[test]
    fn protocol_error_kind() {
        let err: Error = ProtocolError::Timeout(4000).into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(
            err.to_string(),
            "transport error: connection timed out after 4000 ms"
        );
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::DuplicateOutput("M20".to_string());
        assert_eq!(err.to_string(), "duplicate output key: M20");
    }
}
