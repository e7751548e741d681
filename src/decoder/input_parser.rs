// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the inputs topic.

use serde_json::Value;

use crate::config::SignalLayout;
use crate::error::DecodeError;
use crate::state::InputVector;

use super::{coerce, describe, parse_json};

/// Parses a trimmed inputs payload into a vector of the configured length.
///
/// Short arrays are rejected rather than padded.
pub(super) fn parse_inputs(
    topic: &str,
    text: &str,
    layout: &SignalLayout,
) -> Result<InputVector, DecodeError> {
    let items = match parse_json(topic, text)? {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::UnexpectedShape {
                topic: topic.to_string(),
                found: describe(&other),
            });
        }
    };

    let expected = layout.input_count();
    if items.len() < expected {
        return Err(DecodeError::TooShort {
            topic: topic.to_string(),
            expected,
            actual: items.len(),
        });
    }

    items[..expected]
        .iter()
        .enumerate()
        .map(|(i, value)| coerce(topic, format!("I{}", i + 1), value))
        .collect::<Result<Vec<_>, _>>()
        .map(InputVector::from)
}
