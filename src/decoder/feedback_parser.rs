// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the output feedback topic.

use serde_json::{Map, Value};

use crate::config::SignalLayout;
use crate::error::DecodeError;
use crate::state::OutputPatch;
use crate::types::SignalState;

use super::{FeedbackPayload, coerce, describe, parse_json};

/// Parses a trimmed feedback payload.
pub(super) fn parse_feedback(
    topic: &str,
    text: &str,
    layout: &SignalLayout,
) -> Result<FeedbackPayload, DecodeError> {
    let value = match parse_json(topic, text) {
        Ok(value) => value,
        // Legacy firmware publishes a bare ON/OFF without quotes.
        Err(err) => {
            return match text.parse::<SignalState>() {
                Ok(state) => parse_state_string(topic, state, layout),
                Err(_) => Err(err),
            };
        }
    };

    match value {
        Value::Object(map) => parse_object(topic, &map, layout),
        Value::Array(items) => parse_array(topic, &items, layout),
        Value::String(s) => {
            let state = s.parse::<SignalState>().map_err(|_| DecodeError::InvalidValue {
                topic: topic.to_string(),
                element: "payload".to_string(),
                value: format!("{s:?}"),
            })?;
            parse_state_string(topic, state, layout)
        }
        other => Err(DecodeError::UnexpectedShape {
            topic: topic.to_string(),
            found: describe(&other),
        }),
    }
}

fn parse_object(
    topic: &str,
    map: &Map<String, Value>,
    layout: &SignalLayout,
) -> Result<FeedbackPayload, DecodeError> {
    let mut patch = OutputPatch::new();
    for (key, value) in map {
        if layout.output_index(key).is_none() {
            return Err(DecodeError::UnknownOutput {
                topic: topic.to_string(),
                key: key.clone(),
            });
        }
        patch.insert(key.as_str(), coerce(topic, key, value)?);
    }
    Ok(FeedbackPayload::ObjectPatch(patch))
}

fn parse_array(
    topic: &str,
    items: &[Value],
    layout: &SignalLayout,
) -> Result<FeedbackPayload, DecodeError> {
    let expected = layout.output_count();
    if items.len() < expected {
        return Err(DecodeError::TooShort {
            topic: topic.to_string(),
            expected,
            actual: items.len(),
        });
    }

    let values = items[..expected]
        .iter()
        .zip(layout.outputs())
        .map(|(value, key)| coerce(topic, key, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeedbackPayload::ArrayReplace(values))
}

fn parse_state_string(
    topic: &str,
    state: SignalState,
    layout: &SignalLayout,
) -> Result<FeedbackPayload, DecodeError> {
    if layout.output_count() != 1 {
        return Err(DecodeError::AmbiguousString {
            topic: topic.to_string(),
            outputs: layout.output_count(),
        });
    }
    Ok(FeedbackPayload::StringReplace(state.is_on()))
}
