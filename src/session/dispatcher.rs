// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch.

use crate::command::ControlCommand;
use crate::config::Topics;
use crate::error::{Error, Result};
use crate::protocol::Transport;
use crate::state::StateStore;
use crate::types::ConnectionStatus;

/// Turns toggle requests into control commands.
///
/// The dispatcher only reads the state store. The displayed value of an
/// output changes when the controller confirms it on the feedback topic.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    control_topic: String,
}

impl CommandDispatcher {
    /// Creates a dispatcher publishing on the control topic of `topics`.
    #[must_use]
    pub fn new(topics: &Topics) -> Self {
        Self {
            control_topic: topics.control().to_string(),
        }
    }

    /// The topic commands are published on.
    #[must_use]
    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    /// Builds the command that flips `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandRejected` unless `status` is `Connected`, and
    /// `Error::UnknownOutput` if the key is not configured.
    pub fn prepare_toggle(
        &self,
        key: &str,
        store: &StateStore,
        status: ConnectionStatus,
    ) -> Result<ControlCommand> {
        if !status.is_connected() {
            return Err(Error::CommandRejected {
                output: key.to_string(),
                status,
            });
        }
        let current = store
            .output(key)
            .ok_or_else(|| Error::UnknownOutput(key.to_string()))?;
        Ok(ControlCommand::toggle_from(key, current))
    }

    /// Publishes a command.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the transport refuses the publish.
    pub async fn dispatch<T: Transport>(&self, transport: &T, command: &ControlCommand) -> Result<()> {
        transport
            .publish(&self.control_topic, command.payload())
            .await?;
        tracing::debug!(
            topic = %self.control_topic,
            output = %command.output(),
            value = %command.value(),
            "Command published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalLayout;
    use crate::protocol::MemoryTransport;
    use crate::state::OutputPatch;
    use crate::types::SignalState;

    fn setup() -> (CommandDispatcher, StateStore) {
        (
            CommandDispatcher::new(&Topics::default()),
            StateStore::new(&SignalLayout::default()),
        )
    }

    #[test]
    fn toggle_inverts_stored_value() {
        let (dispatcher, store) = setup();
        store
            .apply_output_patch(&OutputPatch::new().with("M22", true))
            .unwrap();

        let cmd = dispatcher
            .prepare_toggle("M22", &store, ConnectionStatus::Connected)
            .unwrap();
        assert_eq!(cmd, ControlCommand::new("M22", SignalState::Off));
    }

    #[test]
    fn rejected_unless_connected() {
        let (dispatcher, store) = setup();
        for status in [
            ConnectionStatus::Connecting,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Error,
        ] {
            let err = dispatcher.prepare_toggle("M20", &store, status).unwrap_err();
            assert!(matches!(err, Error::CommandRejected { status: s, .. } if s == status));
        }
    }

    #[test]
    fn unknown_key() {
        let (dispatcher, store) = setup();
        let err = dispatcher
            .prepare_toggle("M99", &store, ConnectionStatus::Connected)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOutput(ref k) if k == "M99"));
    }

    #[tokio::test]
    async fn dispatch_publishes_on_control_topic() {
        let (dispatcher, _) = setup();
        let (transport, _rx) = MemoryTransport::new();

        dispatcher
            .dispatch(&transport, &ControlCommand::new("M21", SignalState::On))
            .await
            .unwrap();

        assert_eq!(
            transport.published(),
            [(
                "plc/control".to_string(),
                r#"{"output":"M21","value":"ON"}"#.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn dispatch_surfaces_transport_failure() {
        let (dispatcher, _) = setup();
        let (transport, _rx) = MemoryTransport::new();
        transport.fail_publishes(true);

        let err = dispatcher
            .dispatch(&transport, &ControlCommand::new("M21", SignalState::On))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
