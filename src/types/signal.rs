// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary signal values and their wire coercions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValueError;

/// The state of a binary signal as carried in commands.
///
/// # Examples
///
/// ```
/// use plc_link::types::SignalState;
///
/// assert_eq!(SignalState::On.as_str(), "ON");
/// assert_eq!(SignalState::from(false), SignalState::Off);
/// assert_eq!(SignalState::On.inverted(), SignalState::Off);
/// assert_eq!("off".parse::<SignalState>().unwrap(), SignalState::Off);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalState {
    /// Signal is off.
    Off,
    /// Signal is on.
    On,
}

impl SignalState {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` for [`SignalState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns the opposite state.
    #[must_use]
    pub const fn inverted(&self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(ValueError::InvalidSignalState(s.to_string())),
        }
    }
}

impl From<bool> for SignalState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<SignalState> for bool {
    fn from(value: SignalState) -> Self {
        value.is_on()
    }
}

/// Coerces a JSON element to a boolean.
///
/// `true` and `1` are truthy, `false` and `0` are falsy. Anything else,
/// including other numbers, strings and `null`, yields `None`.
#[must_use]
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signal_state_from_str() {
        assert_eq!("ON".parse::<SignalState>().unwrap(), SignalState::On);
        assert_eq!("off".parse::<SignalState>().unwrap(), SignalState::Off);
        assert_eq!(" On ".parse::<SignalState>().unwrap(), SignalState::On);
    }

    #[test]
    fn signal_state_from_str_invalid() {
        let result = "TOGGLE".parse::<SignalState>();
        assert!(matches!(
            result.unwrap_err(),
            ValueError::InvalidSignalState(_)
        ));
    }

    #[test]
    fn signal_state_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&SignalState::On).unwrap(), "\"ON\"");
        let parsed: SignalState = serde_json::from_str("\"OFF\"").unwrap();
        assert_eq!(parsed, SignalState::Off);
    }

    #[test]
    fn coerce_accepts_bools_and_bits() {
        assert_eq!(coerce_bool(&json!(true)), Some(true));
        assert_eq!(coerce_bool(&json!(false)), Some(false));
        assert_eq!(coerce_bool(&json!(1)), Some(true));
        assert_eq!(coerce_bool(&json!(0)), Some(false));
    }

    #[test]
    fn coerce_rejects_everything_else() {
        assert_eq!(coerce_bool(&json!(2)), None);
        assert_eq!(coerce_bool(&json!(-1)), None);
        assert_eq!(coerce_bool(&json!(1.5)), None);
        assert_eq!(coerce_bool(&json!("1")), None);
        assert_eq!(coerce_bool(&json!("ON")), None);
        assert_eq!(coerce_bool(&json!(null)), None);
    }
}
