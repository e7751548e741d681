// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of inbound PLC payloads.
//!
//! The controller publishes on two topics:
//!
//! - the feedback topic - output values, in one of three encodings
//!   (object patch, positional array, bare `ON`/`OFF` string)
//! - the inputs topic - the input vector as a JSON array of `0`/`1`
//!
//! [`decode`] turns a raw payload into a [`Decoded`] value without touching
//! any state. Applying the result is the session's job.
//!
//! # Examples
//!
//! ```
//! use plc_link::config::{SignalLayout, TopicClass};
//! use plc_link::decoder::{Decoded, FeedbackPayload, decode};
//!
//! let layout = SignalLayout::default();
//!
//! let decoded = decode(TopicClass::Feedback, "plc/feedback", br#"{"M21":1}"#, &layout).unwrap();
//! let Decoded::Feedback(FeedbackPayload::ObjectPatch(patch)) = decoded else {
//!     panic!("expected a patch");
//! };
//! assert_eq!(patch.get("M21"), Some(true));
//!
//! let decoded = decode(TopicClass::Inputs, "plc/inputs", b"[1,0,0,0,0,0,0,0]", &layout).unwrap();
//! assert!(matches!(decoded, Decoded::Inputs(ref v) if v.get(0) == Some(true)));
//! ```

mod feedback_parser;
mod input_parser;

use std::fmt::Display;

use serde_json::Value;

use crate::config::{SignalLayout, TopicClass};
use crate::error::DecodeError;
use crate::state::{InputVector, OutputPatch};
use crate::types::coerce_bool;

/// A successfully decoded inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Output feedback.
    Feedback(FeedbackPayload),
    /// A complete input vector, trimmed to the configured length.
    Inputs(InputVector),
}

/// The three feedback encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackPayload {
    /// Object form: only the listed outputs change.
    ObjectPatch(OutputPatch),
    /// Array form: one value per configured output, in configured order.
    ArrayReplace(Vec<bool>),
    /// Bare `ON`/`OFF` for a single-output layout.
    StringReplace(bool),
}

impl FeedbackPayload {
    /// Returns the number of outputs this payload sets.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::ObjectPatch(patch) => patch.len(),
            Self::ArrayReplace(values) => values.len(),
            Self::StringReplace(_) => 1,
        }
    }

    /// Returns `true` if the payload sets nothing (an empty object).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes a payload received on a topic of the given class.
///
/// `topic` is only used to label errors.
///
/// # Errors
///
/// Returns `DecodeError` if the payload is not UTF-8, not valid JSON (and
/// not a bare state string on the feedback topic), has the wrong shape,
/// carries an unknown key or a value other than `1`/`0`/`true`/`false`,
/// or is shorter than the layout requires.
pub fn decode(
    class: TopicClass,
    topic: &str,
    payload: &[u8],
    layout: &SignalLayout,
) -> Result<Decoded, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8 {
        topic: topic.to_string(),
    })?;

    match class {
        TopicClass::Feedback => {
            feedback_parser::parse_feedback(topic, text.trim(), layout).map(Decoded::Feedback)
        }
        TopicClass::Inputs => {
            input_parser::parse_inputs(topic, text.trim(), layout).map(Decoded::Inputs)
        }
    }
}

fn parse_json(topic: &str, text: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(text).map_err(|source| DecodeError::Json {
        topic: topic.to_string(),
        source,
    })
}

/// Coerces one element, labelling a failure with the element name.
fn coerce(topic: &str, element: impl Display, value: &Value) -> Result<bool, DecodeError> {
    coerce_bool(value).ok_or_else(|| DecodeError::InvalidValue {
        topic: topic.to_string(),
        element: element.to_string(),
        value: value.to_string(),
    })
}

/// Short name of a JSON value's type, for shape errors.
fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_utf8() {
        let err = decode(
            TopicClass::Feedback,
            "plc/feedback",
            &[0xff, 0xfe],
            &SignalLayout::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8 { .. }));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let decoded = decode(
            TopicClass::Inputs,
            "plc/inputs",
            b"  [0,0,0,0,0,0,0,1]\n",
            &SignalLayout::default(),
        )
        .unwrap();
        assert!(matches!(decoded, Decoded::Inputs(ref v) if v.get(7) == Some(true)));
    }

    #[test]
    fn describe_names_types() {
        assert_eq!(describe(&Value::Null), "null");
        assert_eq!(describe(&serde_json::json!(3)), "number");
        assert_eq!(describe(&serde_json::json!({})), "object");
    }

    #[test]
    fn payload_len() {
        assert_eq!(FeedbackPayload::StringReplace(true).len(), 1);
        assert!(FeedbackPayload::ObjectPatch(OutputPatch::new()).is_empty());
        assert_eq!(FeedbackPayload::ArrayReplace(vec![true; 4]).len(), 4);
    }
}
