// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named output values.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Current value of every configured output.
///
/// The key set is fixed when the state is created; only values change.
/// Iteration follows the configured key order.
///
/// # Examples
///
/// ```
/// use plc_link::config::SignalLayout;
/// use plc_link::state::OutputState;
///
/// let state = OutputState::new(&SignalLayout::default());
/// assert_eq!(state.get("M20"), Some(false));
/// assert_eq!(state.get("nope"), None);
/// assert_eq!(state.keys().count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputState {
    keys: Arc<[String]>,
    values: Vec<bool>,
}

impl OutputState {
    /// Creates an all-off state for the layout's outputs.
    #[must_use]
    pub fn new(layout: &crate::config::SignalLayout) -> Self {
        let keys = layout.shared_outputs();
        let values = vec![false; keys.len()];
        Self { keys, values }
    }

    /// Returns the value of an output, or `None` for an unknown key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<bool> {
        self.index_of(key).map(|i| self.values[i])
    }

    /// Returns the position of a key in the configured order.
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Returns `true` if the key is configured.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// Returns the keys in configured order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Returns the values in configured order.
    #[must_use]
    pub fn values(&self) -> &[bool] {
        &self.values
    }

    /// Returns `(key, value)` pairs in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no outputs are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if any output is on.
    #[must_use]
    pub fn is_any_on(&self) -> bool {
        self.values.iter().any(|v| *v)
    }

    pub(crate) fn set_at(&mut self, index: usize, value: bool) -> bool {
        let slot = &mut self.values[index];
        let changed = *slot != value;
        *slot = value;
        changed
    }

    pub(crate) fn key_at(&self, index: usize) -> &str {
        &self.keys[index]
    }
}

impl Serialize for OutputState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

/// A partial update of outputs, as carried by object-form feedback.
///
/// Entries keep the order in which they were added. Serializes as a JSON
/// object, the same shape the decoder accepts.
///
/// # Examples
///
/// ```
/// use plc_link::state::OutputPatch;
///
/// let patch = OutputPatch::new().with("M20", true).with("M22", false);
/// assert_eq!(patch.len(), 2);
/// assert_eq!(patch.get("M20"), Some(true));
/// assert_eq!(
///     serde_json::to_string(&patch).unwrap(),
///     r#"{"M20":true,"M22":false}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPatch {
    entries: Vec<(String, bool)>,
}

impl OutputPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: bool) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or overwrites an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: bool) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the value for a key, if present in the patch.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Returns the entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the patch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for OutputPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalLayout;

    #[test]
    fn new_state_is_all_off() {
        let state = OutputState::new(&SignalLayout::default());
        assert_eq!(state.len(), 4);
        assert!(!state.is_any_on());
        assert_eq!(state.values(), [false; 4]);
    }

    #[test]
    fn iter_follows_configured_order() {
        let layout = SignalLayout::new(["Q3", "Q1", "Q2"], 0).unwrap();
        let state = OutputState::new(&layout);
        let keys: Vec<&str> = state.keys().collect();
        assert_eq!(keys, ["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn set_at_reports_change() {
        let mut state = OutputState::new(&SignalLayout::default());
        assert!(state.set_at(1, true));
        assert!(!state.set_at(1, true));
        assert_eq!(state.get("M21"), Some(true));
        assert_eq!(state.key_at(1), "M21");
    }

    #[test]
    fn serializes_as_object() {
        let mut state = OutputState::new(&SignalLayout::default());
        state.set_at(3, true);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"M20":false,"M21":false,"M22":false,"M23":true}"#
        );
    }

    #[test]
    fn patch_insert_overwrites() {
        let mut patch = OutputPatch::new().with("M20", true);
        patch.insert("M20", false);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("M20"), Some(false));
        assert_eq!(patch.get("M21"), None);
    }
}
