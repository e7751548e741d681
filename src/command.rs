// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound control commands.
//!
//! A [`ControlCommand`] asks the controller to drive one output to a target
//! state. It is published on the control topic as
//! `{"output":"<key>","value":"ON"|"OFF"}` and is fire-and-forget: the
//! displayed value only changes once the controller reports it back on the
//! feedback topic.
//!
//! # Examples
//!
//! ```
//! use plc_link::command::ControlCommand;
//! use plc_link::types::SignalState;
//!
//! let cmd = ControlCommand::toggle_from("M21", false);
//! assert_eq!(cmd.value(), SignalState::On);
//! assert_eq!(cmd.payload(), r#"{"output":"M21","value":"ON"}"#);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::SignalState;

/// An intent to set one output to a target state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    output: String,
    value: SignalState,
}

impl ControlCommand {
    /// Creates a command setting `output` to `value`.
    #[must_use]
    pub fn new(output: impl Into<String>, value: SignalState) -> Self {
        Self {
            output: output.into(),
            value,
        }
    }

    /// Creates the command that flips an output whose current value is
    /// `current`.
    #[must_use]
    pub fn toggle_from(output: impl Into<String>, current: bool) -> Self {
        Self::new(output, SignalState::from(!current))
    }

    /// The targeted output key.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The requested state.
    #[must_use]
    pub fn value(&self) -> SignalState {
        self.value
    }

    /// Returns the JSON payload for the control topic.
    #[must_use]
    pub fn payload(&self) -> String {
        serde_json::json!({
            "output": self.output,
            "value": self.value.as_str(),
        })
        .to_string()
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.output, self.value)
    }
}
