// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Positional input values.

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Ordered input signals; position `i` is input `I{i+1}`.
///
/// The length is fixed by the layout. Serializes as a JSON array of
/// `0`/`1`, the wire format of the inputs topic.
///
/// # Examples
///
/// ```
/// use plc_link::state::InputVector;
///
/// let inputs = InputVector::from_bits([1, 0, 1]);
/// assert_eq!(inputs.len(), 3);
/// assert_eq!(inputs.get(0), Some(true));
/// assert_eq!(inputs.get(3), None);
/// assert_eq!(serde_json::to_string(&inputs).unwrap(), "[1,0,1]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputVector {
    values: Vec<bool>,
}

impl InputVector {
    /// Creates an all-off vector of the given length.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![false; len],
        }
    }

    /// Creates a vector from `0`/non-zero bits.
    #[must_use]
    pub fn from_bits(bits: impl IntoIterator<Item = u8>) -> Self {
        Self {
            values: bits.into_iter().map(|b| b != 0).collect(),
        }
    }

    /// Returns the value at a position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.values.get(index).copied()
    }

    /// Returns the values.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.values
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.values.iter().copied()
    }

    /// Returns the number of inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the positions whose value differs from `other`.
    ///
    /// Only the common prefix is compared.
    pub fn diff<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = (usize, bool)> + 'a {
        self.values
            .iter()
            .zip(other.values.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, (_, b))| (i, *b))
    }
}

impl From<Vec<bool>> for InputVector {
    fn from(values: Vec<bool>) -> Self {
        Self { values }
    }
}

impl Serialize for InputVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self.iter() {
            seq.serialize_element(&u8::from(value))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_all_off() {
        let inputs = InputVector::new(8);
        assert_eq!(inputs.len(), 8);
        assert!(inputs.iter().all(|v| !v));
    }

    #[test]
    fn diff_lists_changed_positions() {
        let before = InputVector::from_bits([0, 0, 1, 1]);
        let after = InputVector::from_bits([1, 0, 1, 0]);
        let changes: Vec<_> = before.diff(&after).collect();
        assert_eq!(changes, [(0, true), (3, false)]);
    }

    #[test]
    fn from_bool_vec() {
        let inputs = InputVector::from(vec![true, false]);
        assert_eq!(inputs.as_slice(), [true, false]);
    }
}
