// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A [`StateChange`] describes the values that actually moved during one
//! store mutation. It is what subscribers receive; a full replace that
//! leaves every value as it was produces no change at all.
//!
//! # Examples
//!
//! ```
//! use plc_link::state::StateChange;
//!
//! let change = StateChange::batch(vec![
//!     StateChange::output("M20", true),
//!     StateChange::input(3, false),
//! ]);
//! assert_eq!(change.change_count(), 2);
//! assert!(change.is_batch());
//! ```

use serde::{Deserialize, Serialize};

/// A change in the canonical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// An output changed value.
    Output {
        /// The output key.
        key: String,
        /// The new value.
        value: bool,
    },

    /// An input changed value.
    Input {
        /// Zero-based position in the input vector.
        index: usize,
        /// The new value.
        value: bool,
    },

    /// Several changes applied by one mutation.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Creates an output change.
    #[must_use]
    pub fn output(key: impl Into<String>, value: bool) -> Self {
        Self::Output {
            key: key.into(),
            value,
        }
    }

    /// Creates an input change.
    #[must_use]
    pub fn input(index: usize, value: bool) -> Self {
        Self::Input { index, value }
    }

    /// Creates a batch of changes.
    #[must_use]
    pub fn batch(changes: Vec<StateChange>) -> Self {
        Self::Batch(changes)
    }

    /// Collapses a list of changes: `None` when empty, the single change
    /// when there is one, a batch otherwise.
    #[must_use]
    pub fn collapse(mut changes: Vec<StateChange>) -> Option<Self> {
        match changes.len() {
            0 => None,
            1 => changes.pop(),
            _ => Some(Self::Batch(changes)),
        }
    }

    /// Returns `true` if this is an output change.
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Output { .. })
    }

    /// Returns `true` if this is an input change.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }

    /// Returns `true` if this is a batch of changes.
    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Returns the number of individual changes.
    ///
    /// For batch changes, returns the total count of nested changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        match self {
            Self::Batch(changes) => changes.iter().map(Self::change_count).sum(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(
            StateChange::output("M21", true),
            StateChange::Output {
                key: "M21".to_string(),
                value: true
            }
        );
        assert!(StateChange::input(0, true).is_input());
        assert!(!StateChange::input(0, true).is_output());
    }

    #[test]
    fn collapse() {
        assert_eq!(StateChange::collapse(Vec::new()), None);
        assert_eq!(
            StateChange::collapse(vec![StateChange::input(1, true)]),
            Some(StateChange::input(1, true))
        );
        let batch = StateChange::collapse(vec![
            StateChange::input(1, true),
            StateChange::input(2, true),
        ])
        .unwrap();
        assert!(batch.is_batch());
    }

    #[test]
    fn change_count() {
        let batch = StateChange::batch(vec![
            StateChange::output("M20", true),
            StateChange::output("M21", false),
        ]);
        assert_eq!(batch.change_count(), 2);

        let nested = StateChange::batch(vec![batch, StateChange::input(0, true)]);
        assert_eq!(nested.change_count(), 3);
    }
}
